//! Tracing subscriber setup.

use crate::config::Config;
use tracing_subscriber::EnvFilter;

/// Filter directive for `config`. `voice.debug` lifts the stock `info` level
/// to `debug`; any other level is taken as written.
pub fn filter_directive(config: &Config) -> &str {
    match config.logging.level.as_str() {
        "info" if config.voice.debug => "debug",
        level => level,
    }
}

/// Installs the global subscriber, JSON lines when `logging.json` is set.
/// An unparsable directive falls back to `info`.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(filter_directive(config)).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{}': {}", config.logging.level, e);
        EnvFilter::new("info")
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_raises_default_level() {
        let mut config = Config::default();
        assert_eq!(filter_directive(&config), "info");

        config.voice.debug = true;
        assert_eq!(filter_directive(&config), "debug");

        config.logging.level = "parley_voice=trace,warn".to_string();
        assert_eq!(filter_directive(&config), "parley_voice=trace,warn");
    }
}
