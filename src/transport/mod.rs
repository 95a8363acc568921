mod http_transport;
mod status_policy;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::error::ChatError;
use crate::protocol::ChatRequest;

pub use http_transport::HttpTransport;

/// Response body chunks as they arrive from the network.
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

/// Successful response body, already routed by bot type.
pub enum ResponseBody {
    /// Fully buffered JSON document (image generation).
    Json(Bytes),
    /// Live incremental body.
    Stream(ByteStream),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(body) => f.debug_tuple("Json").field(&body.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Classified result of one outbound request.
#[derive(Debug)]
pub enum TransportOutcome {
    Success(ResponseBody),
    RateLimited { retry_after: Option<Duration> },
    PaymentRequired,
    TransportFailure(ChatError),
}

impl TransportOutcome {
    /// Collapse every non-success outcome into its [`ChatError`].
    ///
    /// # Errors
    ///
    /// Returns the classified error for rate limiting, payment required, or
    /// transport failure.
    pub fn into_result(self) -> Result<ResponseBody, ChatError> {
        match self {
            TransportOutcome::Success(body) => Ok(body),
            TransportOutcome::RateLimited { retry_after } => {
                Err(ChatError::RateLimited { retry_after })
            }
            TransportOutcome::PaymentRequired => Err(ChatError::PaymentRequired),
            TransportOutcome::TransportFailure(err) => Err(err),
        }
    }
}

/// Sends one chat request to the inference endpoint.
pub trait ChatTransport: Send + Sync + 'static {
    fn send(&self, request: &ChatRequest) -> impl Future<Output = TransportOutcome> + Send;
}

impl<T: ChatTransport> ChatTransport for std::sync::Arc<T> {
    async fn send(&self, request: &ChatRequest) -> TransportOutcome {
        (**self).send(request).await
    }
}

/// Fail a body stream with [`ChatError::Stalled`] when no chunk arrives
/// within `idle`. The stream ends right after the stall error.
pub fn with_idle_timeout(stream: ByteStream, idle: Duration) -> ByteStream {
    futures_util::stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(idle_ms = idle.as_millis(), "response stream stalled");
                Some((Err(ChatError::Stalled(idle)), None))
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_timeout_passes_through_live_stream() {
        let source: ByteStream =
            futures_util::stream::iter(vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"b"))])
                .boxed();
        let items: Vec<_> = with_idle_timeout(source, Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_ok));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_reports_stall_once() {
        let source: ByteStream = futures_util::stream::iter(vec![Ok(Bytes::from_static(b"a"))])
            .chain(futures_util::stream::pending())
            .boxed();
        let items: Vec<_> = with_idle_timeout(source, Duration::from_millis(50))
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ChatError::Stalled(_))));
    }

    #[test]
    fn test_outcome_into_result() {
        assert!(matches!(
            TransportOutcome::PaymentRequired.into_result(),
            Err(ChatError::PaymentRequired)
        ));
        assert!(matches!(
            TransportOutcome::RateLimited { retry_after: None }.into_result(),
            Err(ChatError::RateLimited { retry_after: None })
        ));
        assert!(TransportOutcome::Success(ResponseBody::Json(Bytes::new()))
            .into_result()
            .is_ok());
    }
}
