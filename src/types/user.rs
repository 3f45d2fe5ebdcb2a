//! Resolved user identity supplied by the auth collaborator.

use serde::{Deserialize, Serialize};

/// A user resolved from a valid credential.
///
/// The core receives this as an opaque input and never sees credential
/// material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub full_name: String,
    /// Default location for dashboard lookups; `None` until the user sets it.
    #[serde(default)]
    pub default_location: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: full_name.into(),
            default_location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = Some(location.into());
        self
    }

    /// The default location, ignoring blank values.
    pub fn location(&self) -> Option<&str> {
        self.default_location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}
