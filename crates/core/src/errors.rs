use thiserror::Error;

/// Failures reported by the whiteboard backend collaborator.
///
/// Every variant is soft from the conversation's point of view: handlers log
/// it and carry on without the success marker.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("standup `{0}` was not found")]
    StandupNotFound(String),
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned unexpected status {status} for {operation}")]
    UnexpectedStatus { operation: &'static str, status: u16 },
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
    #[error("backend call `{operation}` timed out after {timeout_secs}s")]
    Timeout { operation: &'static str, timeout_secs: u64 },
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StandupNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::BackendError;

    #[test]
    fn not_found_is_distinguished_from_transport_failures() {
        assert!(BackendError::StandupNotFound("7".to_owned()).is_not_found());
        assert!(!BackendError::Transport("connection refused".to_owned()).is_not_found());
        assert_eq!(
            BackendError::Timeout { operation: "submit", timeout_secs: 10 }.to_string(),
            "backend call `submit` timed out after 10s"
        );
    }
}
