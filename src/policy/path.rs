//! File identity and object path construction.
//!
//! Every user file lives at `"<user_id>/<stored_name>"`, where the stored
//! name is `"<epoch_millis>-<display_name>"`. The user id prefix is the
//! access-control boundary, so user-supplied names must never escape it.

use std::fmt;

use crate::storage::PLACEHOLDER_NAME;
use crate::{Result, ShelfError};

/// Check that a user-supplied file name is a single path component.
///
/// Rejects empty names, separators (`/` and `\`), the `.`/`..` segments,
/// control characters and the empty-folder placeholder.
///
/// # Examples
///
/// ```
/// use fileshelf::policy::validate_file_name;
///
/// assert!(validate_file_name("1700000000000-report.pdf").is_ok());
/// assert!(validate_file_name("../other-user/secret.txt").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ShelfError::Validation("file name must not be empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(ShelfError::Validation(format!("invalid file name: {name}")));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ShelfError::Validation(
            "file name must not contain path separators".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(ShelfError::Validation(
            "file name must not contain control characters".to_string(),
        ));
    }
    if name == PLACEHOLDER_NAME {
        return Err(ShelfError::Validation(format!("reserved file name: {name}")));
    }
    Ok(())
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// # Examples
///
/// ```
/// use fileshelf::policy::sanitize_display_name;
///
/// assert_eq!(sanitize_display_name("my file!.pdf"), "my_file_.pdf");
/// ```
pub fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split a stored name into its leading timestamp token and the rest.
///
/// Matches `^(\d+)-`; returns `None` when the name has no such token.
fn split_timestamp(stored_name: &str) -> Option<(&str, &str)> {
    let digits = stored_name
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 || stored_name.as_bytes().get(digits) != Some(&b'-') {
        return None;
    }
    Some((&stored_name[..digits], &stored_name[digits + 1..]))
}

/// Leading `<digits>` token of a stored name, if it has one.
pub fn extract_timestamp(stored_name: &str) -> Option<&str> {
    split_timestamp(stored_name).map(|(token, _)| token)
}

/// Stored name with the timestamp token removed.
pub fn display_name(stored_name: &str) -> &str {
    split_timestamp(stored_name)
        .map(|(_, rest)| rest)
        .unwrap_or(stored_name)
}

/// Build a stored name from a timestamp token and a display name.
pub fn stored_name(timestamp: impl fmt::Display, name: &str) -> String {
    format!("{timestamp}-{name}")
}

/// Location of one user file in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    user_id: String,
    name: String,
}

impl ObjectPath {
    /// Confine `name` to the namespace of `user_id`.
    pub fn new(user_id: &str, name: &str) -> Result<Self> {
        validate_namespace(user_id)?;
        validate_file_name(name)?;
        Ok(Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
        })
    }

    /// Owner namespace.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Stored name within the namespace.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.name)
    }
}

/// Check that a user id can serve as a namespace prefix.
pub fn validate_namespace(user_id: &str) -> Result<()> {
    if user_id.is_empty()
        || user_id == "."
        || user_id == ".."
        || user_id.contains('/')
        || user_id.contains('\\')
    {
        return Err(ShelfError::Validation(format!("invalid user id: {user_id}")));
    }
    Ok(())
}
