use serde::{Deserialize, Serialize};
use std::fmt;

/// Security declared for a configured network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityType {
    Open,
    Wep,
    Wpa,
    Wpa2,
    Wpa3,
    Unknown(String),
}

impl SecurityType {
    /// Case-insensitive. A missing value means open.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::Open;
        };
        match raw.to_ascii_uppercase().as_str() {
            "OPEN" | "NONE" | "" => Self::Open,
            "WEP" => Self::Wep,
            "WPA" | "WPA-PSK" => Self::Wpa,
            "WPA2" | "WPA2-PSK" => Self::Wpa2,
            "WPA3" => Self::Wpa3,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Declared types that cannot be joined without a key.
    pub fn requires_password(&self) -> bool {
        matches!(self, Self::Wep | Self::Wpa | Self::Wpa2 | Self::Wpa3)
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("OPEN"),
            Self::Wep => f.write_str("WEP"),
            Self::Wpa => f.write_str("WPA"),
            Self::Wpa2 => f.write_str("WPA2"),
            Self::Wpa3 => f.write_str("WPA3"),
            Self::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

/// A network from the device configuration. Consumed, never mutated.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetworkSpec {
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub security_type: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub location: Option<String>,
}

impl WifiNetworkSpec {
    pub fn new(ssid: &str, security: &str, password: Option<&str>) -> Self {
        Self {
            ssid: Some(ssid.to_string()),
            security_type: Some(security.to_string()),
            password: password.map(str::to_string),
            hidden: None,
            location: None,
        }
    }

    pub fn ssid(&self) -> Option<&str> {
        self.ssid.as_deref().filter(|s| !s.is_empty())
    }

    pub fn security(&self) -> SecurityType {
        SecurityType::parse(self.security_type.as_deref())
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(false)
    }
}

// Passwords never reach logs.
impl fmt::Debug for WifiNetworkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiNetworkSpec")
            .field("ssid", &self.ssid)
            .field("security_type", &self.security_type)
            .field("has_password", &self.password().is_some())
            .field("hidden", &self.hidden)
            .field("location", &self.location)
            .finish()
    }
}
