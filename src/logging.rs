use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "MIGRANT_LOG";

/// `MIGRANT_LOG` wins over `-v` flags.
pub fn filter_directive(verbose: u8) -> String {
    if let Ok(value) = std::env::var(LOG_ENV) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
    .to_string()
}

pub fn init(verbose: u8) {
    let filter = EnvFilter::try_new(filter_directive(verbose))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
