use std::time::Duration;

/// Error type for one chat request/response cycle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("Rate limited by endpoint")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Payment required by endpoint")]
    PaymentRequired,
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Response decode error: {0}")]
    Decode(String),
    #[error("Stream stalled: no data for {0:?}")]
    Stalled(Duration),
}

/// User-facing classification of a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    PaymentRequired,
    TransportFailure,
}

/// Short title/description pair surfaced to the user when a cycle fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub description: String,
}

impl ChatError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::RateLimited { .. } => ErrorKind::RateLimited,
            ChatError::PaymentRequired => ErrorKind::PaymentRequired,
            ChatError::Upstream { .. }
            | ChatError::Transport(_)
            | ChatError::Decode(_)
            | ChatError::Stalled(_) => ErrorKind::TransportFailure,
        }
    }

    /// Build the notice shown to the user for this error.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            ChatError::RateLimited { retry_after } => Notice {
                title: "Rate Limited",
                description: match retry_after {
                    Some(delay) if !delay.is_zero() => format!(
                        "Too many requests. Please try again in {} seconds.",
                        delay.as_secs().max(1)
                    ),
                    _ => "Too many requests. Please try again in a moment.".to_string(),
                },
            },
            ChatError::PaymentRequired => Notice {
                title: "Credits Required",
                description: "Please add credits to continue using AI features.".to_string(),
            },
            _ => Notice {
                title: "Error",
                description: "Failed to get a response. Please try again.".to_string(),
            },
        }
    }
}

/// Error type for bot and finance persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Invalid record: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ChatError::RateLimited { retry_after: None }.kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(ChatError::PaymentRequired.kind(), ErrorKind::PaymentRequired);
        assert_eq!(
            ChatError::Upstream {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(
            ChatError::Stalled(Duration::from_secs(1)).kind(),
            ErrorKind::TransportFailure
        );
    }

    #[test]
    fn test_notice_texts() {
        let notice = ChatError::RateLimited { retry_after: None }.notice();
        assert_eq!(notice.title, "Rate Limited");
        assert_eq!(
            notice.description,
            "Too many requests. Please try again in a moment."
        );

        let notice = ChatError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        }
        .notice();
        assert_eq!(
            notice.description,
            "Too many requests. Please try again in 7 seconds."
        );

        let notice = ChatError::PaymentRequired.notice();
        assert_eq!(notice.title, "Credits Required");

        let notice = ChatError::Transport("reset".into()).notice();
        assert_eq!(notice.title, "Error");
        assert_eq!(
            notice.description,
            "Failed to get a response. Please try again."
        );
    }
}
