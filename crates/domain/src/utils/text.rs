//! Text helpers

use crate::constants::MAX_ERROR_MESSAGE_LEN;

/// Trim an error description to [`MAX_ERROR_MESSAGE_LEN`] characters,
/// respecting UTF-8 boundaries.
pub fn truncate_reason(reason: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}
