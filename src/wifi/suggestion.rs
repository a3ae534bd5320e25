use super::descriptor::SkipReason;
use super::spec::{SecurityType, WifiNetworkSpec};
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub enum Passphrase {
    None,
    Wpa2(String),
    Wpa3(String),
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Wpa2(_) => f.write_str("Wpa2(..)"),
            Self::Wpa3(_) => f.write_str("Wpa3(..)"),
        }
    }
}

/// A network suggestion submitted on behalf of the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub ssid: String,
    pub hidden: bool,
    /// Only set where the platform accepts a priority hint.
    pub priority: Option<i32>,
    pub passphrase: Passphrase,
    pub app_interaction_required: bool,
}

impl Suggestion {
    pub fn build(spec: &WifiNetworkSpec, priority_hint: bool) -> Result<Self, SkipReason> {
        let ssid = spec.ssid().ok_or(SkipReason::EmptySsid)?;
        let security = spec.security();
        let passphrase = match (&security, spec.password()) {
            (SecurityType::Open, _) => Passphrase::None,
            (SecurityType::Wep, _) => return Err(SkipReason::Unsupported(security)),
            (SecurityType::Wpa3, Some(password)) => Passphrase::Wpa3(password.to_string()),
            (
                SecurityType::Wpa | SecurityType::Wpa2 | SecurityType::Unknown(_),
                Some(password),
            ) => Passphrase::Wpa2(password.to_string()),
            (SecurityType::Unknown(raw), None) => {
                tracing::warn!(ssid, security = %raw, "unknown security without password, suggesting as open");
                Passphrase::None
            }
            (_, None) => return Err(SkipReason::MissingPassword(security)),
        };
        Ok(Self {
            ssid: ssid.to_string(),
            hidden: spec.is_hidden(),
            priority: priority_hint.then_some(i32::MAX),
            passphrase,
            app_interaction_required: true,
        })
    }
}

/// Decoded result of a suggestion submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionStatus {
    Success,
    InternalError,
    UserDisallowed,
    Duplicate,
    QuotaExceeded,
    InvalidRemoval,
    NotAllowed,
    InvalidEntry,
    Unknown(i32),
}

impl SuggestionStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::InternalError,
            2 => Self::UserDisallowed,
            3 => Self::Duplicate,
            4 => Self::QuotaExceeded,
            5 => Self::InvalidRemoval,
            6 => Self::NotAllowed,
            7 => Self::InvalidEntry,
            other => Self::Unknown(other),
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::InternalError => f.write_str("ERROR_INTERNAL"),
            Self::UserDisallowed => f.write_str("ERROR_APP_DISALLOWED"),
            Self::Duplicate => f.write_str("ERROR_ADD_DUPLICATE"),
            Self::QuotaExceeded => f.write_str("ERROR_ADD_EXCEEDS_MAX_PER_APP"),
            Self::InvalidRemoval => f.write_str("ERROR_REMOVE_INVALID"),
            Self::NotAllowed => f.write_str("ERROR_ADD_NOT_ALLOWED"),
            Self::InvalidEntry => f.write_str("ERROR_ADD_INVALID"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}
