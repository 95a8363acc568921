use std::convert::Infallible;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpListener;

const DEFAULT_PORT: u16 = 19_002;
const CHAT_PATH: &str = "/functions/v1/bot-chat";

#[derive(Copy, Clone)]
enum MockScenario {
    Ok,
    RateLimit,
    Payment,
    Error,
}

impl MockScenario {
    fn as_str(self) -> &'static str {
        match self {
            MockScenario::Ok => "ok",
            MockScenario::RateLimit => "rate_limit",
            MockScenario::Payment => "payment",
            MockScenario::Error => "error",
        }
    }
}

struct MockState {
    scenario: MockScenario,
    streamed: AtomicU64,
    images: AtomicU64,
    rejected: AtomicU64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let port = env_u16("MOCK_PORT", DEFAULT_PORT);
    let state = Arc::new(MockState {
        scenario: parse_scenario(),
        streamed: AtomicU64::new(0),
        images: AtomicU64::new(0),
        rejected: AtomicU64::new(0),
    });

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap_or_else(|err| panic!("failed to bind mock endpoint on 127.0.0.1:{port}: {err}"));
    eprintln!(
        "mock bot endpoint on http://127.0.0.1:{port}{CHAT_PATH} (scenario={})",
        state.scenario.as_str()
    );

    let conn_builder = AutoBuilder::new(TokioExecutor::new());
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok((stream, remote_addr)) => (stream, remote_addr),
            Err(err) => {
                eprintln!("accept error: {err}");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let conn_builder = conn_builder.clone();
        let service_state = Arc::clone(&state);
        let service = service_fn(move |request: Request<Incoming>| {
            let state_ref = Arc::clone(&service_state);
            async move { Ok::<_, Infallible>(handle_request(request, &state_ref).await) }
        });

        tokio::spawn(async move {
            if let Err(err) = conn_builder.serve_connection(io, service).await {
                eprintln!("mock endpoint connection error from {remote_addr}: {err}");
            }
        });
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn parse_scenario() -> MockScenario {
    match env::var("MOCK_SCENARIO").as_deref() {
        Ok("rate_limit") => MockScenario::RateLimit,
        Ok("payment") => MockScenario::Payment,
        Ok("error") => MockScenario::Error,
        Ok("ok") | Err(_) => MockScenario::Ok,
        Ok(other) => {
            eprintln!("unknown MOCK_SCENARIO '{other}', fallback to ok");
            MockScenario::Ok
        }
    }
}

async fn handle_request(request: Request<Incoming>, state: &Arc<MockState>) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    let body = read_body(body).await;

    if parts.method == Method::GET && parts.uri.path() == "/_mock/stats" {
        return stats_response(state);
    }
    if parts.method != Method::POST {
        return simple_response_static(
            StatusCode::METHOD_NOT_ALLOWED,
            "application/json",
            br#"{"error":"method_not_allowed"}"#,
        );
    }
    if parts.uri.path() != CHAT_PATH {
        return simple_response_static(
            StatusCode::NOT_FOUND,
            "application/json",
            br#"{"error":"not_found"}"#,
        );
    }
    if !parts.headers.contains_key(header::AUTHORIZATION) {
        state.rejected.fetch_add(1, Ordering::Relaxed);
        return simple_response_static(
            StatusCode::UNAUTHORIZED,
            "application/json",
            br#"{"error":"missing_authorization"}"#,
        );
    }

    match state.scenario {
        MockScenario::RateLimit => {
            state.rejected.fetch_add(1, Ordering::Relaxed);
            let mut response = simple_response_static(
                StatusCode::TOO_MANY_REQUESTS,
                "application/json",
                br#"{"error":"Rate limits exceeded, please try again later."}"#,
            );
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("3"));
            return response;
        }
        MockScenario::Payment => {
            state.rejected.fetch_add(1, Ordering::Relaxed);
            return simple_response_static(
                StatusCode::PAYMENT_REQUIRED,
                "application/json",
                br#"{"error":"Payment required, please add funds."}"#,
            );
        }
        MockScenario::Error => {
            state.rejected.fetch_add(1, Ordering::Relaxed);
            return simple_response_static(
                StatusCode::INTERNAL_SERVER_ERROR,
                "application/json",
                br#"{"error":"mock_injected_error"}"#,
            );
        }
        MockScenario::Ok => {}
    }

    // The request body names the bot type; image bots get one JSON document.
    if contains(&body, b"\"botType\":\"image_generation\"") {
        state.images.fetch_add(1, Ordering::Relaxed);
        return simple_response_static(StatusCode::OK, "application/json", IMAGE_REPLY);
    }

    state.streamed.fetch_add(1, Ordering::Relaxed);
    let mut response = simple_response_static(StatusCode::OK, "text/event-stream", STREAM_REPLY);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

async fn read_body(body: Incoming) -> Bytes {
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

fn stats_response(state: &MockState) -> Response<Full<Bytes>> {
    let body = format!(
        "{{\"scenario\":\"{}\",\"streamed\":{},\"images\":{},\"rejected\":{}}}",
        state.scenario.as_str(),
        state.streamed.load(Ordering::Relaxed),
        state.images.load(Ordering::Relaxed),
        state.rejected.load(Ordering::Relaxed),
    );
    simple_response(StatusCode::OK, "application/json", Bytes::from(body.into_bytes()))
}

fn simple_response(
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn simple_response_static(
    status: StatusCode,
    content_type: &'static str,
    body: &'static [u8],
) -> Response<Full<Bytes>> {
    simple_response(status, content_type, Bytes::from_static(body))
}

const STREAM_REPLY: &[u8] = b": OPENROUTER PROCESSING\n\ndata: {\"id\":\"gen-mock\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"finish_reason\":null}]}\r\n\r\ndata: {\"id\":\"gen-mock\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" from the\"},\"finish_reason\":null}]}\n\ndata: {\"id\":\"gen-mock\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" mock endpoint.\"},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n";
const IMAGE_REPLY: &[u8] = br#"{"id":"gen-mock","choices":[{"index":0,"message":{"role":"assistant","content":"A small red square.","images":[{"type":"image_url","image_url":{"url":"data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg=="}}]},"finish_reason":"stop"}]}"#;
