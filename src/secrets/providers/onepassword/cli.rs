//! 1Password access through the `op` command-line tool.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::SecretRef;
use crate::error::{DenvError, Result};
use crate::secrets::client::SecretClient;
use crate::secrets::property::select_property;

const OP_BINARY: &str = "op";

/// Outcome of a failed `op` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpFailure {
    /// The process could not be started at all.
    Spawn(String),
    /// The process exited unsuccessfully; carries its stderr.
    Exit { code: Option<i32>, stderr: String },
}

/// Runs `op` with the given arguments and returns its stdout.
#[async_trait]
pub trait OpExecutor: Send + Sync {
    async fn exec(&self, args: &[String]) -> std::result::Result<Vec<u8>, OpFailure>;
}

/// Spawns the real `op` binary.
#[derive(Debug, Default)]
pub struct ProcessOpExecutor;

#[async_trait]
impl OpExecutor for ProcessOpExecutor {
    async fn exec(&self, args: &[String]) -> std::result::Result<Vec<u8>, OpFailure> {
        let output = Command::new(OP_BINARY)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OpFailure::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(OpFailure::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

pub struct OnePasswordCliSecretManager {
    id: String,
    account: Option<String>,
    executor: Box<dyn OpExecutor>,
    // `op` prompts for unlock per process; one invocation at a time.
    gate: Mutex<()>,
}

impl OnePasswordCliSecretManager {
    /// Build a client that shells out to `op`. Fails when `op` is not on PATH.
    pub fn connect(id: String, account: Option<String>) -> Result<Self> {
        let path = which::which(OP_BINARY).map_err(|_| {
            DenvError::init(
                &id,
                "the 1Password CLI ('op') was not found on PATH; install it or use auth=\"service-account\"",
            )
        })?;
        debug!(provider = %id, op = %path.display(), "1Password CLI client ready");
        Ok(Self::with_executor(id, account, Box::new(ProcessOpExecutor)))
    }

    pub fn with_executor(id: String, account: Option<String>, executor: Box<dyn OpExecutor>) -> Self {
        Self {
            id,
            account: account.filter(|a| !a.is_empty()),
            executor,
            gate: Mutex::new(()),
        }
    }

    fn build_args(&self, reference: &SecretRef) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if let Some(account) = &self.account {
            args.push("--account".to_string());
            args.push(account.clone());
        }
        args.push("read".to_string());
        args.push(reference.key.clone());
        args
    }

    fn classify(&self, key: &str, failure: OpFailure) -> DenvError {
        match failure {
            OpFailure::Spawn(e) => {
                DenvError::unavailable(&self.id, format!("failed to run op: {}", e))
            }
            OpFailure::Exit { code, stderr } => {
                let lower = stderr.to_lowercase();
                if lower.contains("isn't an item")
                    || lower.contains("not found")
                    || lower.contains("no item")
                    || lower.contains("isn't a field")
                {
                    DenvError::not_found(&self.id, key)
                } else {
                    let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                    DenvError::unavailable(
                        &self.id,
                        format!("op command failed (exit {}): {}", code, stderr),
                    )
                }
            }
        }
    }
}

#[async_trait]
impl SecretClient for OnePasswordCliSecretManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "onepassword"
    }

    async fn get_secret(&self, reference: &SecretRef) -> Result<Vec<u8>> {
        let args = self.build_args(reference);

        let mut out = {
            let _guard = self.gate.lock().await;
            self.executor
                .exec(&args)
                .await
                .map_err(|f| self.classify(&reference.key, f))?
        };

        // `op read` terminates the value with a newline
        if out.last() == Some(&b'\n') {
            out.pop();
        }

        select_property(out, reference)
    }
}
