use std::time::Duration;

use futures_util::StreamExt;
use http::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::bots::model::ResponseMode;
use crate::config::EndpointConfig;
use crate::error::ChatError;
use crate::protocol::ChatRequest;

use super::status_policy::{
    classify_status, parse_retry_after_delay, truncate_error_body, StatusClass,
};
use super::{ChatTransport, ResponseBody, TransportOutcome};

fn build_reqwest_client(config: &EndpointConfig) -> Result<reqwest::Client, ChatError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host)
        .pool_idle_timeout(config.pool_idle_timeout())
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(reqwest::redirect::Policy::none());

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|err| ChatError::Transport(format!("Invalid proxy URL: {err}")))?;
        builder = builder.no_proxy().proxy(proxy);
    } else if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| ChatError::Transport(format!("Failed to build HTTP client: {err}")))
}

fn timed_out(limit: Duration) -> ChatError {
    ChatError::Transport(format!("request timed out after {}s", limit.as_secs()))
}

/// HTTP transport for the chat function endpoint.
///
/// Requests are never retried; the user resends manually.
///
/// `endpoint.timeout` bounds the wait for response headers and the read of a
/// buffered body. Streamed bodies are not bounded by it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: url::Url,
    authorization: String,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build the transport with connection pooling and timeouts from the
    /// endpoint config.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] when the URL does not parse, the proxy
    /// URL is invalid, or the HTTP client cannot be built.
    pub fn new(config: &EndpointConfig) -> Result<Self, ChatError> {
        let url = url::Url::parse(&config.url)
            .map_err(|err| ChatError::Transport(format!("Invalid endpoint URL: {err}")))?;
        Ok(Self {
            client: build_reqwest_client(config)?,
            url,
            authorization: format!("Bearer {}", config.api_key),
            request_timeout: Duration::from_secs(config.timeout),
        })
    }

    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<bytes::Bytes, ChatError> {
        match tokio::time::timeout(self.request_timeout, response.bytes()).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(err)) => Err(ChatError::Transport(err.to_string())),
            Err(_) => Err(timed_out(self.request_timeout)),
        }
    }

    async fn execute(&self, request: &ChatRequest) -> TransportOutcome {
        let body = match serde_json::to_vec(request) {
            Ok(body) => body,
            Err(err) => {
                return TransportOutcome::TransportFailure(ChatError::Transport(format!(
                    "Failed to encode request: {err}"
                )))
            }
        };

        let pending = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.authorization)
            .body(body)
            .send();
        let response = match tokio::time::timeout(self.request_timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "chat request failed before a response");
                return TransportOutcome::TransportFailure(ChatError::Transport(err.to_string()));
            }
            Err(_) => {
                tracing::debug!(
                    timeout_secs = self.request_timeout.as_secs(),
                    "chat request timed out waiting for response headers"
                );
                return TransportOutcome::TransportFailure(timed_out(self.request_timeout));
            }
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::RateLimited => {
                let retry_after = parse_retry_after_delay(response.headers());
                tracing::debug!(
                    retry_after_ms = retry_after.map(|delay| delay.as_millis()),
                    "endpoint rate limited the request"
                );
                TransportOutcome::RateLimited { retry_after }
            }
            StatusClass::PaymentRequired => TransportOutcome::PaymentRequired,
            StatusClass::Failure => {
                let message = match self.read_body(response).await {
                    Ok(body) => truncate_error_body(&body),
                    Err(err) => err.to_string(),
                };
                tracing::debug!(status = status.as_u16(), %message, "endpoint returned an error status");
                TransportOutcome::TransportFailure(ChatError::Upstream {
                    status: status.as_u16(),
                    message,
                })
            }
            StatusClass::Success => match request.bot_type.response_mode() {
                ResponseMode::SingleShot => match self.read_body(response).await {
                    Ok(body) => TransportOutcome::Success(ResponseBody::Json(body)),
                    Err(err) => TransportOutcome::TransportFailure(err),
                },
                ResponseMode::Incremental => {
                    let stream = response
                        .bytes_stream()
                        .map(|chunk| chunk.map_err(|err| ChatError::Transport(err.to_string())))
                        .boxed();
                    TransportOutcome::Success(ResponseBody::Stream(stream))
                }
            },
        }
    }
}

impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> TransportOutcome {
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_url() {
        let err = HttpTransport::new(&EndpointConfig::new("not a url", "key")).unwrap_err();
        assert!(matches!(err, ChatError::Transport(message) if message.contains("Invalid endpoint URL")));
    }

    #[test]
    fn test_bearer_header_from_key() {
        let transport =
            HttpTransport::new(&EndpointConfig::new("http://127.0.0.1:9/bot-chat", "secret"))
                .unwrap();
        assert_eq!(transport.authorization, "Bearer secret");
        assert_eq!(transport.url().path(), "/bot-chat");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);
        let transport =
            HttpTransport::new(&EndpointConfig::new(format!("http://{addr}/bot-chat"), "key"))
                .unwrap();
        let request =
            ChatRequest::from_log(&[], "sys", "model", crate::bots::model::BotType::Chatbot);
        let outcome = transport.send(&request).await;
        assert!(matches!(
            outcome,
            TransportOutcome::TransportFailure(ChatError::Transport(_))
        ));
    }
}
