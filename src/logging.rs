//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so that stdout stays
/// usable for command output. `RUST_LOG` overrides the verbosity flag.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "denv=warn",
        1 => "denv=info",
        _ => "denv=debug",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
