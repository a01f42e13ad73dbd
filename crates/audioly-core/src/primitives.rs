//! # Primitives
//!
//! Hardcoded limits for the Audioly core.
//!
//! All listings are bounded by a fixed window; there is no cursor
//! pagination. Input limits are enforced before any record is written.

/// Maximum number of entries returned by a directory listing or search.
///
/// Entries are ordered newest-first by account creation time.
pub const DIRECTORY_WINDOW: usize = 50;

/// Maximum number of songs returned by the explore and feed listings.
pub const LISTING_WINDOW: usize = 100;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a display name, in bytes.
pub const MAX_NAME_LENGTH: usize = 80;

/// Maximum length of a handle, in bytes.
pub const MAX_HANDLE_LENGTH: usize = 32;

/// Maximum length of a song title, in bytes.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length of a song category, in bytes.
pub const MAX_CATEGORY_LENGTH: usize = 64;

/// Maximum length of a directory search string, in bytes, after trimming.
pub const MAX_QUERY_LENGTH: usize = 100;

/// Object store folder for audio payloads.
pub const AUDIO_FOLDER: &str = "audioly/audio";

/// Object store folder for cover images.
pub const COVER_FOLDER: &str = "audioly/covers";

/// Object store folder for profile images.
pub const AVATAR_FOLDER: &str = "audioly/avatars";

/// Validate a display name: non-empty after trimming, within the limit.
pub fn validate_name(name: &str) -> Result<&str, crate::SocialError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::SocialError::InvalidInput("name is required".into()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(crate::SocialError::InvalidInput(format!(
            "name exceeds {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed)
}

/// Validate and normalize a handle.
///
/// Handles are lowercase ASCII letters, digits, `_`, `.` and `-`.
pub fn validate_handle(handle: &str) -> Result<String, crate::SocialError> {
    let normalized = crate::User::normalize_handle(handle);
    if normalized.is_empty() {
        return Err(crate::SocialError::InvalidInput("handle is required".into()));
    }
    if normalized.len() > MAX_HANDLE_LENGTH {
        return Err(crate::SocialError::InvalidInput(format!(
            "handle exceeds {} bytes",
            MAX_HANDLE_LENGTH
        )));
    }
    if !normalized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(crate::SocialError::InvalidInput(format!(
            "handle '{}' contains invalid characters",
            normalized
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_window_is_fifty() {
        assert_eq!(DIRECTORY_WINDOW, 50);
    }

    #[test]
    fn name_is_trimmed() {
        assert_eq!(validate_name("  Jo  ").expect("valid"), "Jo");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn handle_is_normalized_and_checked() {
        assert_eq!(validate_handle(" Jo.Beats ").expect("valid"), "jo.beats");
        assert!(validate_handle("").is_err());
        assert!(validate_handle("has space").is_err());
        assert!(validate_handle(&"a".repeat(MAX_HANDLE_LENGTH + 1)).is_err());
    }
}
