//! Config string utils.

use std::collections::HashMap;

/// Splits config value string into the name and the options string.
/// Example: `BestFitThreshold[threshold=0.8]` gives name `BestFitThreshold` and options `threshold=0.8`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.trim().split_once('[') {
        Some((name, rest)) => (name.trim().to_string(), Some(rest.trim_end_matches(']').to_string())),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses comma-separated `name=value` pairs, pairs without `=` are skipped.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    options_str
        .split(',')
        .filter_map(|option| option.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}
