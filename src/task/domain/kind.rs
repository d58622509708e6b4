//! CAPTCHA provider kinds.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// CAPTCHA provider a task must be solved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaKind {
    /// Google reCAPTCHA.
    Recaptcha,
    /// hCaptcha; used when the requester does not specify a kind.
    #[default]
    Hcaptcha,
}

impl CaptchaKind {
    /// Returns the canonical storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recaptcha => "recaptcha",
            Self::Hcaptcha => "hcaptcha",
        }
    }

    /// Parses an optional requester-supplied kind, defaulting when absent
    /// or blank.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnsupportedCaptchaKind`] for unknown kinds.
    pub fn from_optional(value: Option<&str>) -> Result<Self, TaskDomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(raw) => Self::try_from(raw),
        }
    }
}

impl TryFrom<&str> for CaptchaKind {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recaptcha" => Ok(Self::Recaptcha),
            "hcaptcha" => Ok(Self::Hcaptcha),
            _ => Err(TaskDomainError::UnsupportedCaptchaKind(value.to_owned())),
        }
    }
}

impl fmt::Display for CaptchaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
