use std::path::PathBuf;

use sketchboard_shared::MalformedPayload;
use thiserror::Error;

use crate::state::StrokePhase;

#[derive(Debug, Error)]
pub enum SketchError {
    /// A stroke operation was called out of order, e.g. commit without begin.
    #[error("{operation} is not valid while {phase:?}")]
    InvalidState {
        operation: &'static str,
        phase: StrokePhase,
    },

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] MalformedPayload),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("participant lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type SketchResult<T> = Result<T, SketchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_operation_and_phase() {
        let err = SketchError::InvalidState {
            operation: "commit_stroke",
            phase: StrokePhase::Idle,
        };
        let msg = err.to_string();
        assert!(msg.contains("commit_stroke"));
        assert!(msg.contains("Idle"));
    }

    #[test]
    fn malformed_payload_converts() {
        let err: SketchError = MalformedPayload::UnknownColor(77).into();
        assert!(matches!(err, SketchError::MalformedPayload(_)));
        assert!(err.to_string().contains("77"));
    }
}
