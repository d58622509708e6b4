//! Validated opaque strings carried by tasks.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! non_empty_text {
    ($(#[$meta:meta])* $name:ident, $error:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a validated value, stored exactly as given.
            ///
            /// # Errors
            ///
            /// Returns the matching [`TaskDomainError`] variant when the value
            /// is blank.
            pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
                let raw = value.into();
                if raw.trim().is_empty() {
                    return Err($error);
                }
                Ok(Self(raw))
            }

            /// Returns the value as `str`.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

non_empty_text!(
    /// Public site key of the CAPTCHA widget.
    SiteKey,
    TaskDomainError::EmptySiteKey
);

non_empty_text!(
    /// Page URL on which the CAPTCHA is rendered.
    TargetUrl,
    TaskDomainError::EmptyTargetUrl
);

non_empty_text!(
    /// Response token produced by a solver.
    SolutionToken,
    TaskDomainError::EmptySolutionToken
);

non_empty_text!(
    /// Solver-supplied reason for giving up on a task.
    FailureReason,
    TaskDomainError::EmptyFailureReason
);
