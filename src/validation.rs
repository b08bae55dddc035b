//! Validation module for user-supplied input
//!
//! Checks applied before any collaborator is called:
//!
//! - Image paths (empty, null bytes, `..` traversal, length)
//! - Product search queries (blank, length, control characters)
//! - Transcriptions handed in directly instead of an image

use std::fmt;
use std::path::{Component, Path};

/// Maximum allowed path length (4096 bytes on most systems)
pub const MAX_PATH_LENGTH: usize = 4096;

/// Maximum allowed filename length (255 bytes on most filesystems)
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum search query length in characters
pub const MAX_QUERY_LENGTH: usize = 200;

/// Maximum transcription length in characters
pub const MAX_TRANSCRIPTION_LENGTH: usize = 100_000;

/// Errors that can occur during input validation
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// Empty path provided
    EmptyPath,
    /// Path contains null bytes
    NullByte,
    /// Path contains dangerous traversal sequences (..)
    PathTraversal,
    /// Path is too long
    PathTooLong,
    /// Filename is too long
    FilenameTooLong,
    /// Query is blank after trimming
    EmptyQuery,
    /// Query exceeds the length limit (actual length)
    QueryTooLong(usize),
    /// Query contains control characters
    ControlCharacters,
    /// Transcription exceeds the length limit (actual length)
    TranscriptionTooLong(usize),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::EmptyPath => write!(f, "Image path is empty"),
            InputError::NullByte => write!(f, "Image path contains null bytes"),
            InputError::PathTraversal => write!(f, "Image path contains directory traversal"),
            InputError::PathTooLong => {
                write!(f, "Image path exceeds {} bytes", MAX_PATH_LENGTH)
            }
            InputError::FilenameTooLong => {
                write!(f, "Image filename exceeds {} bytes", MAX_FILENAME_LENGTH)
            }
            InputError::EmptyQuery => write!(f, "Search query is empty"),
            InputError::QueryTooLong(len) => write!(
                f,
                "Search query is {} characters, limit is {}",
                len, MAX_QUERY_LENGTH
            ),
            InputError::ControlCharacters => write!(f, "Search query contains control characters"),
            InputError::TranscriptionTooLong(len) => write!(
                f,
                "Transcription is {} characters, limit is {}",
                len, MAX_TRANSCRIPTION_LENGTH
            ),
        }
    }
}

impl std::error::Error for InputError {}

fn contains_path_traversal(path: &str) -> bool {
    if path.contains("..")
        && Path::new(path)
            .components()
            .any(|component| matches!(component, Component::ParentDir))
    {
        return true;
    }

    // URL-encoded traversal
    path.to_ascii_lowercase().contains("%2e%2e")
}

/// Validate an image path before it is opened
///
/// # Examples
///
/// ```rust
/// use just_nutrition::validation::{validate_image_path, InputError};
///
/// assert!(validate_image_path("label.jpg").is_ok());
/// assert!(validate_image_path("/tmp/photos/label.png").is_ok());
/// assert_eq!(validate_image_path("../etc/passwd"), Err(InputError::PathTraversal));
/// assert_eq!(validate_image_path(""), Err(InputError::EmptyPath));
/// ```
pub fn validate_image_path(path: &str) -> Result<(), InputError> {
    if path.is_empty() {
        return Err(InputError::EmptyPath);
    }

    if path.len() > MAX_PATH_LENGTH {
        return Err(InputError::PathTooLong);
    }

    if path.contains('\0') {
        return Err(InputError::NullByte);
    }

    if contains_path_traversal(path) {
        return Err(InputError::PathTraversal);
    }

    if let Some(filename) = Path::new(path).file_name() {
        if filename.len() > MAX_FILENAME_LENGTH {
            return Err(InputError::FilenameTooLong);
        }
    }

    Ok(())
}

/// Validate a product search query, returning it trimmed
///
/// # Examples
///
/// ```rust
/// use just_nutrition::validation::{validate_search_query, InputError};
///
/// assert_eq!(validate_search_query("  granola bar "), Ok("granola bar"));
/// assert_eq!(validate_search_query("   "), Err(InputError::EmptyQuery));
/// ```
pub fn validate_search_query(query: &str) -> Result<&str, InputError> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return Err(InputError::EmptyQuery);
    }

    let length = trimmed.chars().count();
    if length > MAX_QUERY_LENGTH {
        return Err(InputError::QueryTooLong(length));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(InputError::ControlCharacters);
    }

    Ok(trimmed)
}

/// Validate a transcription supplied directly by the caller
///
/// Empty transcriptions are accepted; they simply yield an empty record.
pub fn validate_transcription(text: &str) -> Result<(), InputError> {
    let length = text.chars().count();
    if length > MAX_TRANSCRIPTION_LENGTH {
        return Err(InputError::TranscriptionTooLong(length));
    }
    Ok(())
}
