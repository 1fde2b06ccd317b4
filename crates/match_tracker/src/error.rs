use match_pipeline::TransformError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Network or HTTP failure talking to the match API.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The match API answered with a body we could not decode.
    #[error("malformed upstream payload: {0}")]
    MalformedUpstreamPayload(String),

    #[error("target {target_id} not found among participants of {match_id}")]
    DataMissing { match_id: String, target_id: String },

    #[error("no recent match for {player_id}")]
    NoRecentMatch { player_id: String },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("storage: {0}")]
    Storage(String),
}

impl TrackerError {
    /// Transient errors leave tracked state untouched so the next cycle retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_)
                | Self::MalformedUpstreamPayload(_)
                | Self::Delivery(_)
                | Self::Storage(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_)      => "unavailable",
            Self::MalformedUpstreamPayload(_) => "malformed",
            Self::DataMissing { .. }          => "data_missing",
            Self::NoRecentMatch { .. }        => "no_recent_match",
            Self::Delivery(_)                 => "delivery",
            Self::Storage(_)                  => "storage",
        }
    }
}

/// First `max_chars` characters of an upstream body, for error messages.
pub fn body_snippet(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

impl From<TransformError> for TrackerError {
    fn from(e: TransformError) -> Self {
        match e {
            TransformError::DataMissing { match_id, target_id } => Self::DataMissing { match_id, target_id },
        }
    }
}
