use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `kioskd`.
///
/// Every variant maps onto one failure class of the agent (see [`ErrorKind`]).
/// Command handlers return these; the router turns them into audit entries and
/// never lets them reach the command transport.
#[derive(Debug, Error)]
pub enum AgentError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Malformed command payload ───────────────────────────────────────
    #[error("malformed command: {0}")]
    Malformed(#[from] CommandError),

    // ── Privilege ───────────────────────────────────────────────────────
    #[error("insufficient privilege: {0}")]
    PrivilegeInsufficient(String),

    // ── Platform capability ─────────────────────────────────────────────
    #[error("capability absent: {0}")]
    CapabilityAbsent(String),

    // ── I/O ─────────────────────────────────────────────────────────────
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    // ── Resources (audio, wake lock) ────────────────────────────────────
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    // ── Platform collaborator ───────────────────────────────────────────
    #[error("platform: {0}")]
    Platform(#[from] PlatformError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure classes used to pick an audit severity and a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PrivilegeInsufficient,
    MalformedCommand,
    CapabilityAbsent,
    TransientIo,
    ResourceAcquisition,
    Internal,
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) => ErrorKind::MalformedCommand,
            Self::PrivilegeInsufficient(_) => ErrorKind::PrivilegeInsufficient,
            Self::CapabilityAbsent(_) | Self::Platform(PlatformError::Unsupported(_)) => {
                ErrorKind::CapabilityAbsent
            }
            Self::Io(_) | Self::Platform(_) => ErrorKind::TransientIo,
            Self::ResourceUnavailable(_) => ErrorKind::ResourceAcquisition,
            Self::Config(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Command payload errors ──────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command}: no payload")]
    MissingPayload { command: String },

    #[error("{command}: missing field `{field}`")]
    MissingField { command: String, field: String },

    #[error("{command}: invalid `{field}`: {message}")]
    InvalidField {
        command: String,
        field: String,
        message: String,
    },
}

// ─── Platform collaborator errors ────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("{operation} rejected: {message}")]
    Rejected { operation: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl PlatformError {
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = AgentError::Config(ConfigError::Validation("poll interval".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn malformed_command_names_field() {
        let err = AgentError::from(CommandError::MissingField {
            command: "run-app".into(),
            field: "pkg".into(),
        });
        assert!(err.to_string().contains("`pkg`"));
        assert_eq!(err.kind(), ErrorKind::MalformedCommand);
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let agent_err: AgentError = anyhow_err.into();
        assert!(agent_err.to_string().contains("something went wrong"));
        assert_eq!(agent_err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn unsupported_platform_op_is_capability_absent() {
        let err = AgentError::from(PlatformError::Unsupported("lock task features".into()));
        assert_eq!(err.kind(), ErrorKind::CapabilityAbsent);

        let err = AgentError::from(PlatformError::rejected("add_network", "returned -1"));
        assert_eq!(err.kind(), ErrorKind::TransientIo);
    }
}
