use once_cell::sync::Lazy;
use regex::Regex;

use crate::ics24_host::error::{ValidationError as Error, ValidationKind as Kind};

/// Path separator (ie. forward slash '/')
const PATH_SEPARATOR: char = '/';

/// Alphanumerics plus `.`, `_`, `+`, `-`, `#`, `[`, `]`, `<` and `>`.
static VALID_ID: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._+\-#\[\]<>]+$").ok());

/// Default validator function for identifiers.
///
/// A valid identifier is between `min` and `max` characters long, never contains the path
/// separator and only uses the characters allowed by ICS 24.
pub fn validate_identifier(id: &str, min: usize, max: usize) -> Result<(), Error> {
    assert!(max >= min);

    // Check identifier is not empty
    if id.is_empty() {
        return Err(Kind::empty().into());
    }

    // Check identifier does not contain path separators
    if id.contains(PATH_SEPARATOR) {
        return Err(Kind::contains_separator(id.to_string()).into());
    }

    // Check identifier length is between given min/max
    if id.len() < min || id.len() > max {
        return Err(Kind::invalid_length(id.to_string(), id.len(), min, max).into());
    }

    match VALID_ID.as_ref() {
        Some(valid_id) if valid_id.is_match(id) => {}
        _ => return Err(Kind::invalid_character(id.to_string()).into()),
    }

    Ok(())
}

/// Client identifiers are between 9 and 64 characters.
pub fn validate_client_identifier(id: &str) -> Result<(), Error> {
    validate_identifier(id, 9, 64)
}

/// Connection identifiers are between 10 and 64 characters.
pub fn validate_connection_identifier(id: &str) -> Result<(), Error> {
    validate_identifier(id, 10, 64)
}

/// Port identifiers are between 2 and 128 characters.
pub fn validate_port_identifier(id: &str) -> Result<(), Error> {
    validate_identifier(id, 2, 128)
}

/// Channel identifiers are between 8 and 64 characters.
pub fn validate_channel_identifier(id: &str) -> Result<(), Error> {
    validate_identifier(id, 8, 64)
}
