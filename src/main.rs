use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use denv::cli::{Cli, Commands};
use denv::commands::{Drift, handle_gen, handle_init, handle_outdated, handle_run};
use denv::config::Config;
use denv::error::{DenvError, Result};
use denv::secrets::providers::expand_credentials_env;

fn main() -> ExitCode {
    let cli = Cli::parse();
    denv::logging::init(cli.config.verbose);

    // Environment writes must happen before the runtime starts its threads.
    expand_credentials_env();

    // `outdated` reserves exit code 1 for drift
    let error_code = match cli.command {
        Commands::Outdated { .. } => 2,
        _ => 1,
    };

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(DenvError::from)
        .and_then(|runtime| runtime.block_on(run(cli)));

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(error_code)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.config;

    match cli.command {
        Commands::Init { path, overwrite } => {
            handle_init(path, overwrite)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { envfile, command } => {
            let code = handle_run(&envfile, &command).await?;
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        Commands::Gen { output, resolve } => {
            let config = Config::load_from_path(&config_path)?;
            let cancel = root_token(resolve.timeout());
            handle_gen(&config, &output, resolve.options(), &cancel).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Outdated {
            envfile,
            name_only,
            resolve,
        } => {
            let config = Config::load_from_path(&config_path)?;
            let cancel = root_token(resolve.timeout());
            match handle_outdated(&config, &envfile, name_only, resolve.options(), &cancel).await? {
                Drift::InSync => Ok(ExitCode::SUCCESS),
                Drift::Outdated(_) => Ok(ExitCode::from(1)),
            }
        }
    }
}

/// Token cancelled on Ctrl-C or once `timeout` elapses.
fn root_token(timeout: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    if let Some(timeout) = timeout {
        let on_deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(seconds = timeout.as_secs(), "timed out, cancelling");
            on_deadline.cancel();
        });
    }

    token
}
