//! Name and text validation for command definitions.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConstructionError;

/// Longest description the platform accepts.
pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Longest string option the platform accepts, bounds for `min_length`/`max_length`.
pub const MAX_STRING_OPTION_LEN: u16 = 6000;
/// Entries per option list, choice list or group.
pub const MAX_ENTRIES: usize = 25;

// `\w` is Unicode-aware in `regex`; Devanagari and Thai combining marks are not
// word characters so they are listed explicitly.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-_\w\p{Devanagari}\p{Thai}]{1,32}$").unwrap());

/// Validate a command, group or option name and return it unchanged.
pub fn validate_name(name: &str) -> Result<&str, ConstructionError> {
    if NAME_PATTERN.is_match(name) {
        Ok(name)
    } else {
        Err(ConstructionError::InvalidName { name: name.to_string() })
    }
}

/// Validate a description against the platform length limit.
pub fn validate_description(owner: &str, description: &str) -> Result<(), ConstructionError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ConstructionError::TooLong {
            name: owner.to_string(),
            field: "description",
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Check `min_length` ∈ [0, 6000] and `max_length` ∈ [1, 6000].
pub fn validate_length_bounds(
    owner: &str,
    min_length: Option<u16>,
    max_length: Option<u16>,
) -> Result<(), ConstructionError> {
    if let Some(min) = min_length {
        if min > MAX_STRING_OPTION_LEN {
            return Err(ConstructionError::LengthOutOfRange {
                name: owner.to_string(),
                field: "min_length",
                value: min,
                min: 0,
                max: MAX_STRING_OPTION_LEN,
            });
        }
    }
    if let Some(max) = max_length {
        if !(1..=MAX_STRING_OPTION_LEN).contains(&max) {
            return Err(ConstructionError::LengthOutOfRange {
                name: owner.to_string(),
                field: "max_length",
                value: max,
                min: 1,
                max: MAX_STRING_OPTION_LEN,
            });
        }
    }
    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            return Err(ConstructionError::LengthBoundsInverted {
                name: owner.to_string(),
                min,
                max,
            });
        }
    }
    Ok(())
}
