//! Parsing of string key/value parameters used by measurements and filters.

use crate::OligoError;
use std::str::FromStr;

/// Parse a typed parameter value, naming its owner in the error
pub fn parse_param<T>(owner: &str, key: &str, value: &str) -> Result<T, OligoError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        OligoError::Config(format!(
            "{}: invalid value '{}' for parameter '{}': {}",
            owner, value, key, e
        ))
    })
}

/// Parse a boolean parameter, accepting the usual spellings
pub fn parse_bool(owner: &str, key: &str, value: &str) -> Result<bool, OligoError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(OligoError::Config(format!(
            "{}: invalid boolean '{}' for parameter '{}'",
            owner, value, key
        ))),
    }
}

pub fn unknown_param(owner: &str, key: &str) -> OligoError {
    OligoError::Config(format!("{} has no parameter '{}'", owner, key))
}

pub fn missing_param(owner: &str, key: &str) -> OligoError {
    OligoError::Config(format!("{}: missing required parameter '{}'", owner, key))
}
