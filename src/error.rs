use std::process::ExitStatus;

/// Failures surfaced while talking to the Keybase chat API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client binary could not be spawned at all.
    #[error("failed to run {binary} for `{method}`: {source}")]
    Spawn {
        binary: String,
        method: String,
        #[source]
        source: std::io::Error,
    },

    /// The client ran but exited unsuccessfully.
    #[error("`{method}` call exited with {status}: {stderr}")]
    Transport {
        method: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{method}` returned undecodable output: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{method}` protocol violation: {reason}")]
    Protocol { method: String, reason: String },

    #[error("history of {conversation_id} exceeded {limit} pages")]
    PageLimit { conversation_id: String, limit: usize },

    #[error("history of {conversation_id} returned cursor {cursor:?} twice")]
    CursorRepeated {
        conversation_id: String,
        cursor: String,
    },
}

impl Error {
    pub(crate) fn protocol(method: &str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures of the child process itself (absent binary, non-zero exit).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
