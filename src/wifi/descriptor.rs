use super::spec::{SecurityType, WifiNetworkSpec};
use std::fmt;

/// Key management of a raw network descriptor. Keys are stored quoted,
/// the way the saved-network store expects them.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyManagement {
    Open,
    Psk { pre_shared_key: String },
    Wep { key: String },
}

impl fmt::Debug for KeyManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Psk { .. } => f.write_str("Psk(..)"),
            Self::Wep { .. } => f.write_str("Wep(..)"),
        }
    }
}

/// Raw descriptor for the direct-add mechanisms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    /// SSID wrapped in double quotes.
    pub ssid: String,
    pub hidden: bool,
    pub key_management: KeyManagement,
}

/// Why a network was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptySsid,
    MissingPassword(SecurityType),
    Unsupported(SecurityType),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySsid => f.write_str("empty SSID"),
            Self::MissingPassword(security) => write!(f, "{security} network has no password"),
            Self::Unsupported(security) => write!(f, "{security} is not supported here"),
        }
    }
}

fn quoted(value: &str) -> String {
    format!("\"{value}\"")
}

impl NetworkDescriptor {
    /// Build the descriptor for `spec`.
    ///
    /// A type that requires a password and has none is skipped, never
    /// coerced to open. An unrecognized type without a password is open.
    pub fn build(spec: &WifiNetworkSpec) -> Result<Self, SkipReason> {
        let ssid = spec.ssid().ok_or(SkipReason::EmptySsid)?;
        let security = spec.security();
        let key_management = match (&security, spec.password()) {
            (SecurityType::Open, _) => KeyManagement::Open,
            (SecurityType::Wep, Some(password)) => KeyManagement::Wep {
                key: quoted(password),
            },
            (
                SecurityType::Wpa | SecurityType::Wpa2 | SecurityType::Wpa3 | SecurityType::Unknown(_),
                Some(password),
            ) => KeyManagement::Psk {
                pre_shared_key: quoted(password),
            },
            (SecurityType::Unknown(raw), None) => {
                tracing::warn!(ssid, security = %raw, "unknown security without password, adding as open");
                KeyManagement::Open
            }
            (_, None) => return Err(SkipReason::MissingPassword(security)),
        };
        Ok(Self {
            ssid: quoted(ssid),
            hidden: spec.is_hidden(),
            key_management,
        })
    }
}
