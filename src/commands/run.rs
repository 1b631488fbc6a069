//! Run command - execute a program with a dotenv file's variables added.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::dotenv;
use crate::error::{DenvError, Result};

/// Handle the run command. Returns the child's exit code; a child killed by
/// a signal reports `128 + signal` like a shell would.
pub async fn handle_run(envfile: &Path, command: &[String]) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| DenvError::Other("no command given to run".to_string()))?;

    let env = dotenv::read_file(envfile)?;
    debug!(program = %program, vars = env.len(), "running command");

    let status = build_command(program, args, &env)
        .status()
        .await
        .map_err(|e| DenvError::Other(format!("failed to run '{}': {}", program, e)))?;

    Ok(exit_code(status))
}

/// The child inherits this process's environment and stdio; `env` entries
/// override inherited variables of the same name.
fn build_command(program: &str, args: &[String], env: &BTreeMap<String, String>) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).envs(env);
    cmd
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
