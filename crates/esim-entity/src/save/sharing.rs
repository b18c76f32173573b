//! Share toggle tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use esim_core::AppError;

/// Desired visibility of a save, as spelled in the share route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingState {
    /// Non-owners may read the save.
    On,
    /// Only the owner may read the save.
    Off,
}

impl SharingState {
    /// The value of the `shared` flag this state stands for.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Return the token as it appears in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SharingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SharingState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(AppError::bad_request(format!(
                "Invalid sharing state: '{s}'. Expected 'on' or 'off'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esim_core::error::ErrorKind;

    #[test]
    fn test_parse_tokens() {
        assert_eq!("on".parse::<SharingState>().unwrap(), SharingState::On);
        assert_eq!("off".parse::<SharingState>().unwrap(), SharingState::Off);
        assert!(SharingState::On.is_shared());
        assert!(!SharingState::Off.is_shared());
    }

    #[test]
    fn test_unknown_token_is_bad_request() {
        let err = "ON".parse::<SharingState>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert!("maybe".parse::<SharingState>().is_err());
    }
}
