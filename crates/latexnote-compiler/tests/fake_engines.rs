//! End-to-end runs against fake engine scripts standing in for a TeX install.
#![cfg(unix)]

use latexnote_compiler::{
    Candidate, CompilationOutcome, Compiler, CompilerConfig, EngineKind, FailureKind, Locator,
    LocatorConfig, TokioCommandRunner,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DOCUMENT: &str = "\\documentclass{article}\\begin{document}Hello\\end{document}";

/// Answers `--version`, otherwise writes a PDF into the directory after `flag`.
fn producing_engine(flag: &str, extra: &str) -> String {
    format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "fake 1.0"; exit 0; fi
{extra}
outdir=""
while [ $# -gt 0 ]; do
  case "$1" in
    {flag}) outdir="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf '%%PDF-1.5\n%%fake\n' > "$outdir/document.pdf"
"#
    )
}

const FAILING_ENGINE: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "fake 1.0"; exit 0; fi
echo "! Undefined control sequence." >&2
exit 1
"#;

const HANGING_ENGINE: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "fake 1.0"; exit 0; fi
exec sleep 30
"#;

/// A shell engine that forks a helper and then blocks without `exec`.
fn forking_engine(marker: &Path) -> String {
    format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo "fake 1.0"; exit 0; fi
( sleep 3; touch '{}' ) &
sleep 30
"#,
        marker.display()
    )
}

fn install(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(tectonic: Vec<Candidate>, pdflatex: Vec<Candidate>, root: &Path) -> CompilerConfig {
    CompilerConfig {
        compile_timeout_secs: 30,
        workspace_root: Some(root.to_path_buf()),
        locator: LocatorConfig {
            tectonic,
            pdflatex,
            ..LocatorConfig::default()
        },
    }
}

#[tokio::test]
async fn test_locator_skips_missing_candidates() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let tectonic = install(bin.path(), "tectonic", &producing_engine("--outdir", ""));

    let locator_config = LocatorConfig {
        search_path: Some(bin.path().to_string_lossy().into_owned()),
        tectonic: vec![
            Candidate::path(bin.path().join("not-installed")),
            Candidate::search_path("tectonic"),
        ],
        pdflatex: vec![Candidate::search_path("pdflatex")],
        ..LocatorConfig::default()
    };
    let toolchains = Locator::new(locator_config, Arc::new(TokioCommandRunner))
        .discover()
        .await;

    assert_eq!(toolchains.tectonic.executable, Some(tectonic));
    assert!(!toolchains.pdflatex.is_available());
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_with_primary_engine() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    let tectonic = install(bin.path(), "tectonic", &producing_engine("--outdir", ""));
    let pdflatex = install(bin.path(), "pdflatex", FAILING_ENGINE);

    let compiler = Compiler::discover(&config(
        vec![Candidate::path(&tectonic)],
        vec![Candidate::path(&pdflatex)],
        root.path(),
    ))
    .await?;
    assert!(compiler.capabilities().tectonic_available);
    assert!(compiler.capabilities().pdflatex_available);

    for _ in 0..3 {
        let pdf = compiler.compile(DOCUMENT).await.into_result()?;
        assert!(pdf.starts_with(b"%PDF-1.5"));
    }
    assert_eq!(fs::read_dir(root.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_secondary_engine_runs_twice() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    let counter = bin.path().join("runs");
    let count_run = format!("echo run >> '{}'", counter.display());
    let pdflatex = install(
        bin.path(),
        "pdflatex",
        &producing_engine("-output-directory", &count_run),
    );

    let compiler = Compiler::discover(&config(
        vec![Candidate::path(bin.path().join("tectonic"))],
        vec![Candidate::path(&pdflatex)],
        root.path(),
    ))
    .await?;
    assert!(!compiler.capabilities().tectonic_available);

    let outcome = compiler.compile(DOCUMENT).await;
    assert!(outcome.is_success());
    assert_eq!(fs::read_to_string(&counter)?.lines().count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failing_engines_report_stderr() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    let tectonic = install(bin.path(), "tectonic", FAILING_ENGINE);

    let compiler = Compiler::discover(&config(
        vec![Candidate::path(&tectonic)],
        vec![],
        root.path(),
    ))
    .await?;

    match compiler.compile(DOCUMENT).await {
        CompilationOutcome::Failure(failure) => {
            assert_eq!(failure.kind, FailureKind::Compilation);
            assert_eq!(failure.diagnostics.len(), 1);
            assert_eq!(
                failure.to_string(),
                "Tectonic error: ! Undefined control sequence."
            );
        }
        CompilationOutcome::Success { .. } => anyhow::bail!("failing engine produced a PDF"),
    }
    assert_eq!(fs::read_dir(root.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_hanging_engine_is_killed_at_timeout() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    let tectonic = install(bin.path(), "tectonic", HANGING_ENGINE);

    let mut config = config(vec![Candidate::path(&tectonic)], vec![], root.path());
    config.compile_timeout_secs = 1;
    let compiler = Compiler::discover(&config).await?;

    let started = Instant::now();
    let failure = match compiler.compile(DOCUMENT).await {
        CompilationOutcome::Failure(failure) => failure,
        CompilationOutcome::Success { .. } => anyhow::bail!("hanging engine produced a PDF"),
    };
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(failure.to_string().contains("timed out"));
    assert_eq!(
        failure.diagnostics[0].source,
        latexnote_compiler::DiagnosticSource::Engine(EngineKind::Tectonic)
    );
    assert_eq!(fs::read_dir(root.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_no_engines_refuses_to_start() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;

    let result = Compiler::discover(&config(
        vec![Candidate::path(bin.path().join("tectonic"))],
        vec![Candidate::path(bin.path().join("pdflatex"))],
        root.path(),
    ))
    .await;
    assert!(matches!(
        result,
        Err(latexnote_compiler::CompileError::ToolchainUnavailable)
    ));
    Ok(())
}

#[tokio::test]
async fn test_timeout_kills_engine_helpers() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    let marker = bin.path().join("helper-finished");
    let tectonic = install(bin.path(), "tectonic", &forking_engine(&marker));

    let mut config = config(vec![Candidate::path(&tectonic)], vec![], root.path());
    config.compile_timeout_secs = 1;
    let compiler = Compiler::discover(&config).await?;

    let started = Instant::now();
    let outcome = compiler.compile(DOCUMENT).await;
    assert!(!outcome.is_success());
    assert!(started.elapsed() < Duration::from_secs(3));

    // the helper would have touched the marker after 3s
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!marker.exists(), "engine helper survived the timeout");
    assert_eq!(fs::read_dir(root.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_background_helper_does_not_fail_successful_run() -> anyhow::Result<()> {
    let bin = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    let tectonic = install(
        bin.path(),
        "tectonic",
        &producing_engine("--outdir", "sleep 10 &"),
    );

    let mut config = config(vec![Candidate::path(&tectonic)], vec![], root.path());
    config.compile_timeout_secs = 5;
    let compiler = Compiler::discover(&config).await?;

    let started = Instant::now();
    let pdf = compiler.compile(DOCUMENT).await.into_result()?;
    assert!(pdf.starts_with(b"%PDF-1.5"));
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}
