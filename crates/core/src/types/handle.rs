//! URL handles (slugs) for products and collections.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Handle`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The handle is empty.
    #[error("handle cannot be empty")]
    Empty,
    /// The handle is too long.
    #[error("handle must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The handle contains a character outside `[a-z0-9-]`.
    #[error("handle may only contain lowercase letters, digits and dashes (found {0:?})")]
    InvalidCharacter(char),
    /// The handle starts or ends with a dash, or contains `--`.
    #[error("handle dashes must separate words")]
    MisplacedDash,
}

/// A URL-safe product or collection handle such as `oxford-brogue`.
///
/// Shopify handles follow the same shape, so synced handles parse as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Maximum handle length.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a handle, rejecting anything that is not already a valid slug.
    ///
    /// # Errors
    ///
    /// Returns a [`HandleError`] for empty, overlong or malformed input.
    pub fn parse(s: &str) -> Result<Self, HandleError> {
        if s.is_empty() {
            return Err(HandleError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(HandleError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(HandleError::InvalidCharacter(c));
        }
        if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(HandleError::MisplacedDash);
        }
        Ok(Self(s.to_owned()))
    }

    /// Build a handle from free text such as a product title.
    ///
    /// Runs of non-alphanumeric characters collapse into a single dash.
    /// Returns `None` when the title has no ASCII alphanumerics at all.
    ///
    /// ```
    /// use cobbler_core::Handle;
    ///
    /// let handle = Handle::from_title("The Wing-Tip  Oxford (Brown)").unwrap();
    /// assert_eq!(handle.as_str(), "the-wing-tip-oxford-brown");
    /// ```
    #[must_use]
    pub fn from_title(title: &str) -> Option<Self> {
        let mut slug = String::with_capacity(title.len());
        let mut pending_dash = false;

        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }

        slug.truncate(Self::MAX_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }

        Self::parse(&slug).ok()
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Handle {
    type Error = HandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Handle::parse("chelsea-boot").is_ok());
        assert!(Handle::parse("style-42").is_ok());
        assert!(Handle::parse("a").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Handle::parse(""), Err(HandleError::Empty));
        assert_eq!(
            Handle::parse("Chelsea"),
            Err(HandleError::InvalidCharacter('C'))
        );
        assert_eq!(
            Handle::parse("chelsea boot"),
            Err(HandleError::InvalidCharacter(' '))
        );
        assert_eq!(Handle::parse("-boot"), Err(HandleError::MisplacedDash));
        assert_eq!(Handle::parse("boot-"), Err(HandleError::MisplacedDash));
        assert_eq!(
            Handle::parse("chelsea--boot"),
            Err(HandleError::MisplacedDash)
        );
    }

    #[test]
    fn test_from_title() {
        assert_eq!(
            Handle::from_title("  Derby / Suede ").unwrap().as_str(),
            "derby-suede"
        );
        assert_eq!(Handle::from_title("Größe 42").unwrap().as_str(), "gr-e-42");
        assert!(Handle::from_title("!!!").is_none());
    }

    #[test]
    fn test_from_title_truncates() {
        let title = "word ".repeat(100);
        let handle = Handle::from_title(&title).unwrap();
        assert!(handle.as_str().len() <= Handle::MAX_LENGTH);
        assert!(!handle.as_str().ends_with('-'));
    }
}
