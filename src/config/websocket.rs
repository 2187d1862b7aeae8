//! WebSocket channel configuration

use serde::Deserialize;

use super::error::ValidationError;

/// WebSocket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Maximum length of a relayed chat message, in characters.
    #[serde(default = "default_max_chat_len")]
    pub max_chat_len: usize,
}

impl WebSocketConfig {
    /// Validate WebSocket configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_chat_len == 0 {
            return Err(ValidationError::InvalidChatLimit);
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_chat_len: default_max_chat_len(),
        }
    }
}

fn default_max_chat_len() -> usize {
    4000
}
