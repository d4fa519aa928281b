use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the verbosity flag.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    }
    .is_ok();
    if !installed {
        tracing::debug!("global subscriber already installed");
    }
}
