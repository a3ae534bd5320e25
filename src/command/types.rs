use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use strum::EnumString;

/// One inbound remote command. Consumed exactly once by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub message_type: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl Command {
    pub fn new(message_type: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
        }
    }

    /// Command with a plain string payload.
    pub fn text(message_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(message_type, Some(Value::String(payload.into())))
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::from_str(&self.message_type)
            .unwrap_or_else(|_| CommandKind::Other(self.message_type.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum CommandKind {
    ConfigUpdated,
    RunApp,
    Broadcast,
    UninstallApp,
    DeleteFile,
    DeleteDir,
    PurgeDir,
    PermissiveMode,
    RunCommand,
    Reboot,
    ExitKiosk,
    EnterKiosk,
    AdminPanel,
    ClearDownloads,
    Intent,
    GrantPermissions,
    ClearAppData,
    OpenUrl,
    SetVolume,
    SetBrightness,
    PingLocation,
    EmergencyMode,
    Lock,
    Unlock,
    Attention,
    Message,
    /// Forwarded to extension modules.
    #[strum(default)]
    Other(String),
}

/// Where a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// On the control task, before the next command is taken.
    Inline,
    /// On a background worker; unordered relative to other workers.
    Background,
    /// On a background worker that starts only after the previous ordered
    /// command finished. Lock transitions keep arrival order this way.
    Ordered,
}

impl CommandKind {
    pub fn dispatch_mode(&self) -> DispatchMode {
        match self {
            Self::ConfigUpdated
            | Self::PermissiveMode
            | Self::EnterKiosk
            | Self::ExitKiosk
            | Self::AdminPanel
            | Self::RunApp
            | Self::Broadcast
            | Self::OpenUrl
            | Self::Attention
            | Self::Message
            | Self::EmergencyMode
            | Self::Other(_) => DispatchMode::Inline,
            Self::UninstallApp
            | Self::DeleteFile
            | Self::DeleteDir
            | Self::PurgeDir
            | Self::RunCommand
            | Self::Reboot
            | Self::ClearDownloads
            | Self::Intent
            | Self::GrantPermissions
            | Self::ClearAppData
            | Self::SetVolume
            | Self::SetBrightness
            | Self::PingLocation => DispatchMode::Background,
            Self::Lock | Self::Unlock => DispatchMode::Ordered,
        }
    }
}
