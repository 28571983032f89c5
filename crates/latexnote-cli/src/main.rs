use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use latexnote_compiler::{
    fingerprint, validate, CompilationOutcome, Compiler, CompilerConfig, Locator,
    TokioCommandRunner, Toolchains,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "latexnote")]
#[command(about = "Compile LaTeX notes to PDF", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .tex file to PDF
    Compile {
        /// Path to the LaTeX source
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Where to write the PDF (defaults to FILE with a .pdf extension)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
        /// Per-engine timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
    /// Report which LaTeX engines are available
    Status,
    /// Check a .tex file for structural problems without compiling it
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct StatusReport<'a> {
    tectonic_available: bool,
    pdflatex_available: bool,
    status: &'static str,
    message: &'static str,
    toolchains: &'a Toolchains,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CompilerConfig> {
    match path {
        Some(path) => Ok(CompilerConfig::load(path)?),
        None => Ok(CompilerConfig::default()),
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile {
            path,
            output,
            timeout,
        } => {
            if let Some(secs) = timeout {
                if secs == 0 {
                    bail!("--timeout must be greater than zero");
                }
                config.compile_timeout_secs = secs;
            }
            let source = read_source(&path)?;
            let compiler = Compiler::discover(&config)
                .await
                .context("LaTeX compilation is not configured")?;

            match compiler.compile(&source).await {
                CompilationOutcome::Success { pdf } => {
                    let output = output.unwrap_or_else(|| path.with_extension("pdf"));
                    fs::write(&output, &pdf)
                        .with_context(|| format!("failed to write {}", output.display()))?;
                    println!(
                        "{} ({} bytes, sha256 {})",
                        output.display(),
                        pdf.len(),
                        fingerprint(&pdf)
                    );
                }
                CompilationOutcome::Failure(failure) => {
                    log::error!("LaTeX compilation failed for {}", path.display());
                    eprintln!("{}", failure);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status => {
            let toolchains = Locator::new(config.locator.clone(), Arc::new(TokioCommandRunner))
                .discover()
                .await;
            let capabilities = latexnote_compiler::Capabilities::from(&toolchains);
            let report = StatusReport {
                tectonic_available: capabilities.tectonic_available,
                pdflatex_available: capabilities.pdflatex_available,
                status: capabilities.status(),
                message: capabilities.message(),
                toolchains: &toolchains,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Check { path } => {
            let source = read_source(&path)?;
            match validate(&source) {
                Ok(()) => println!("{}: ok", path.display()),
                Err(e) => bail!("{}: {}", path.display(), e),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile_with_global_config() {
        let cli = Cli::parse_from([
            "latexnote",
            "compile",
            "notes.tex",
            "-o",
            "out.pdf",
            "--config",
            "latexnote.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("latexnote.json")));
        match cli.command {
            Commands::Compile { path, output, timeout } => {
                assert_eq!(path, PathBuf::from("notes.tex"));
                assert_eq!(output, Some(PathBuf::from("out.pdf")));
                assert_eq!(timeout, None);
            }
            _ => panic!("expected compile command"),
        }
    }

    #[test]
    fn test_default_config_without_flag() {
        let config = load_config(None).unwrap();
        assert_eq!(config.compile_timeout_secs, 30);
    }
}
