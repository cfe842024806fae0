use std::io;

/// Installs the global subscriber. Logs go to stderr so they don't mix with the REPL.
pub fn setup_logging(verbose_level: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        // Use RUST_LOG if set
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        // Map verbosity count to filters
        tracing_subscriber::EnvFilter::new(filter_for_verbosity(verbose_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

fn filter_for_verbosity(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,simple_agent=info",
        1 => "info,simple_agent=debug",
        _ => "debug,simple_agent=trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filters() {
        assert_eq!(filter_for_verbosity(0), "warn,simple_agent=info");
        assert_eq!(filter_for_verbosity(1), "info,simple_agent=debug");
        assert_eq!(filter_for_verbosity(5), "debug,simple_agent=trace");
    }
}
