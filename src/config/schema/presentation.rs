use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    #[serde(default = "default_attention_timeout_ms")]
    pub attention_timeout_ms: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

fn default_attention_timeout_ms() -> u64 {
    5_000
}

fn default_message_timeout_ms() -> u64 {
    10_000
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            attention_timeout_ms: default_attention_timeout_ms(),
            message_timeout_ms: default_message_timeout_ms(),
        }
    }
}
