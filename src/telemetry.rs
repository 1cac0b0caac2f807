//! Log setup for the exam CLI.
//!
//! Targets used across the crate:
//! - `exam`: document parsing, generation and grading
//! - `bank`: bank parsing and dropped blocks
//! - `rewrite`: the rewrite provider and shuffle fallbacks
//! - `mock_exam`: command dispatch and config loading
//!
//! `LOG_LEVEL` takes EnvFilter directives (for example `warn,rewrite=debug`);
//! `LOG_FORMAT=json` switches to one JSON object per event. Everything goes to
//! stderr because stdout carries the command's JSON result.

use tracing_subscriber::EnvFilter;

/// Used when LOG_LEVEL is unset or does not parse.
const DEFAULT_FILTER: &str = "info,exam=info,bank=info,rewrite=info,mock_exam=debug";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The two formatters are different types, so each arm calls init itself.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            builder.json().init();
        }
        _ => {
            builder.init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
