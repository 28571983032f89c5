use crate::runner::{CommandRunner, Invocation};
use crate::workspace::Workspace;
use log::warn;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// `tectonic --outdir <ws> --keep-logs <ws>/document.tex`, run inside the workspace.
pub(super) fn invocation(program: &Path, workspace: &Workspace, timeout: Duration) -> Invocation {
    Invocation::new(
        program,
        [
            OsString::from("--outdir"),
            workspace.path().into(),
            "--keep-logs".into(),
            workspace.source_path().into(),
        ],
        timeout,
    )
    .with_working_dir(workspace.path())
}

/// A single Tectonic run; Tectonic resolves references internally.
pub(super) async fn compile(
    runner: &dyn CommandRunner,
    program: &Path,
    workspace: &Workspace,
    timeout: Duration,
) -> Result<(), String> {
    let output = runner
        .run(&invocation(program, workspace, timeout))
        .await
        .map_err(|e| {
            warn!("Failed to run {}: {:#}", program.display(), e);
            "failed to start tectonic".to_string()
        })?;

    if output.success() {
        Ok(())
    } else {
        Err(output.diagnostic())
    }
}
