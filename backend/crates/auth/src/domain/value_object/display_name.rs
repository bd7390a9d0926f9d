//! Display Name Value Object

use kernel::error::app_error::AppResult;
use kernel::validation::required_text;
use derive_more::Display;
use serde::Serialize;

pub const DISPLAY_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Trimmed, 1 to 100 characters, no control characters.
    pub fn new(name: &str) -> AppResult<Self> {
        required_text("Name", name, DISPLAY_NAME_MAX_CHARS).map(Self)
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
