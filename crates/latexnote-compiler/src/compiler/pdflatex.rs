use crate::runner::{CommandRunner, Invocation};
use crate::workspace::Workspace;
use log::{debug, warn};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// pdflatex needs a second pass to settle labels and citations.
const PASSES: u32 = 2;

/// `pdflatex -interaction=nonstopmode -output-directory <ws> <ws>/document.tex`
pub(super) fn invocation(program: &Path, workspace: &Workspace, timeout: Duration) -> Invocation {
    Invocation::new(
        program,
        [
            OsString::from("-interaction=nonstopmode"),
            "-output-directory".into(),
            workspace.path().into(),
            workspace.source_path().into(),
        ],
        timeout,
    )
    .with_working_dir(workspace.path())
}

/// Runs pdflatex exactly twice, strictly in sequence.
///
/// A failed first pass aborts immediately with that pass's diagnostic; the
/// second pass's exit status decides the overall result.
pub(super) async fn compile(
    runner: &dyn CommandRunner,
    program: &Path,
    workspace: &Workspace,
    timeout: Duration,
) -> Result<(), String> {
    let invocation = invocation(program, workspace, timeout);

    for pass in 1..=PASSES {
        let output = runner
            .run(&invocation)
            .await
            .map_err(|e| {
                warn!("Failed to run {}: {:#}", program.display(), e);
                "failed to start pdflatex".to_string()
            })?;

        if !output.success() {
            if pass == 1 {
                warn!("pdflatex first run failed, skipping second run");
            }
            return Err(output.diagnostic());
        }
        debug!("pdflatex pass {}/{} finished", pass, PASSES);
    }
    Ok(())
}
