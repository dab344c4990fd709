//! Player and clan tag normalization

use crate::error::ApiError;

/// Characters that can appear in a tag
pub const VALID_TAG_CHARS: &str = "0289PYLQGRJCUV";

/// Minimum number of characters after the `#`
const MIN_TAG_LEN: usize = 3;

/// Normalizes a tag into its URL-ready form
///
/// Strips leading/trailing `#`, uppercases, replaces the letter `O` with the
/// digit `0`, validates the characters and length, then prefixes the
/// percent-encoded `#` (`%23`).
///
/// `"#2qpgv2vy"` becomes `"%232QPGV2VY"`.
pub fn normalize_tag(tag: &str) -> Result<String, ApiError> {
    let normalized = tag.trim_matches('#').to_uppercase().replace('O', "0");

    if let Some(bad) = normalized.chars().find(|c| !VALID_TAG_CHARS.contains(*c)) {
        return Err(ApiError::InvalidTag {
            tag: normalized.clone(),
            reason: format!(
                "invalid character '{}', valid characters are {}",
                bad, VALID_TAG_CHARS
            ),
        });
    }

    if normalized.len() < MIN_TAG_LEN {
        return Err(ApiError::InvalidTag {
            tag: normalized,
            reason: format!("too short, expected min length {}", MIN_TAG_LEN),
        });
    }

    Ok(format!("%23{}", normalized))
}
