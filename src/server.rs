use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::post,
};
use eyre::{Result, WrapErr};
use log::{error, info};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::resolver::Resolver;
use crate::{TranscriptError, TranscriptResult};

pub const TRANSCRIPT_PATH: &str = "/api/youtube-transcript";

#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TranscriptRequest {
    url: Option<String>,
}

// serde would happily read a struct from a JSON array, so insist on an object.
fn parse_request(body: &[u8]) -> Result<TranscriptRequest, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("request body must be a JSON object"));
    }
    serde_json::from_value(value)
}

/// Turn a raw request body into a status code and result document.
///
/// This is the only entry point into the resolver from HTTP; the router
/// below is just framing around it.
pub async fn handle_transcript_request(resolver: &Resolver, body: &[u8], timeout: Duration) -> (StatusCode, TranscriptResult) {
    if body.iter().all(u8::is_ascii_whitespace) {
        return (StatusCode::BAD_REQUEST, TranscriptError::MissingUrl.into());
    }

    let request = match parse_request(body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, TranscriptError::JsonDecode(e).into()),
    };

    let url = match request.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return (StatusCode::BAD_REQUEST, TranscriptError::MissingUrl.into()),
    };

    match tokio::time::timeout(timeout, resolver.resolve(&url)).await {
        Ok(result) => (StatusCode::OK, result),
        Err(_) => {
            error!("Transcript resolution for {url} timed out after {timeout:?}");
            let err = TranscriptError::Server(format!("transcript resolution timed out after {}s", timeout.as_secs()));
            (StatusCode::GATEWAY_TIMEOUT, err.into())
        }
    }
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers
}

async fn transcript(State(state): State<AppState>, body: Bytes) -> Response {
    let (status, result) = handle_transcript_request(&state.resolver, &body, state.timeout).await;
    info!("POST transcript -> {status}");
    (status, cors_headers(), Json(result)).into_response()
}

async fn preflight() -> Response {
    (StatusCode::OK, cors_headers()).into_response()
}

async fn endpoint_status() -> Response {
    let body = serde_json::json!({
        "success": true,
        "message": "YouTube transcript API is running",
        "endpoint": TRANSCRIPT_PATH,
        "method": "POST",
    });
    (StatusCode::OK, cors_headers(), Json(body)).into_response()
}

async fn not_found(uri: Uri) -> Response {
    let result = TranscriptResult::from(TranscriptError::Server(format!("endpoint not found: {}", uri.path())));
    (StatusCode::NOT_FOUND, cors_headers(), Json(result)).into_response()
}

async fn method_not_allowed(uri: Uri) -> Response {
    let result = TranscriptResult::from(TranscriptError::Server(format!("method not allowed on {}", uri.path())));
    (StatusCode::METHOD_NOT_ALLOWED, cors_headers(), Json(result)).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            TRANSCRIPT_PATH,
            post(transcript).options(preflight).get(endpoint_status),
        )
        .route("/", post(transcript).options(preflight))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running HTTP server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{FakeSource, seg, track};
    use crate::source::{CaptionList, CaptionSource, CaptionTrack};
    use crate::{ErrorType, Segment, VideoId};
    use async_trait::async_trait;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn resolver() -> Resolver {
        let source = FakeSource::new(
            vec![track("en", false)],
            vec![seg("Never gonna give you up", 0.0), seg("never gonna let you down", 2.0)],
        );
        Resolver::new(Arc::new(source))
    }

    struct SlowSource;

    #[async_trait]
    impl CaptionSource for SlowSource {
        async fn list_captions(&self, _video_id: &VideoId) -> Result<CaptionList, TranscriptError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CaptionList::default())
        }

        async fn fetch_segments(&self, _video_id: &VideoId, _track: &CaptionTrack) -> Result<Vec<Segment>, TranscriptError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, result) = handle_transcript_request(&resolver(), b"{not json", TIMEOUT).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(result.error_type(), Some(ErrorType::JsonDecodeError));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let bodies: [&[u8]; 5] = [b"{}", br#"{"url": ""}"#, br#"{"url": "   "}"#, b"", br#"{"url": null}"#];
        for body in bodies {
            let (status, result) = handle_transcript_request(&resolver(), body, TIMEOUT).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(result.error_type(), Some(ErrorType::MissingUrl));
        }
    }

    #[tokio::test]
    async fn test_non_object_body() {
        let bodies: [&[u8]; 3] = [br#"["https://youtu.be/dQw4w9WgXcQ"]"#, b"\"https://youtu.be/dQw4w9WgXcQ\"", b"42"];
        for body in bodies {
            let (status, result) = handle_transcript_request(&resolver(), body, TIMEOUT).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(result.error_type(), Some(ErrorType::JsonDecodeError));
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_ok_status() {
        let body = br#"{"url": "https://example.com/video"}"#;
        let (status, result) = handle_transcript_request(&resolver(), body, TIMEOUT).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result.error_type(), Some(ErrorType::InvalidUrl));
    }

    #[tokio::test]
    async fn test_success() {
        let body = br#"{"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#;
        let (status, result) = handle_transcript_request(&resolver(), body, TIMEOUT).await;
        assert_eq!(status, StatusCode::OK);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_timeout() {
        let resolver = Resolver::new(Arc::new(SlowSource));
        let body = br#"{"url": "https://youtu.be/dQw4w9WgXcQ"}"#;
        let (status, result) = handle_transcript_request(&resolver, body, Duration::from_millis(20)).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(result.error_type(), Some(ErrorType::ServerError));
    }

    async fn spawn_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState {
            resolver: resolver(),
            timeout: TIMEOUT,
        };
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_http_round_trip() {
        let base = spawn_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}{TRANSCRIPT_PATH}"))
            .json(&serde_json::json!({"url": "https://youtu.be/dQw4w9WgXcQ"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(resp.headers()["content-type"], "application/json");

        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["language"], "en");
        assert_eq!(json["video_id"], "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_http_preflight() {
        let base = spawn_server().await;
        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}{TRANSCRIPT_PATH}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(resp.headers()["access-control-allow-methods"], "POST, OPTIONS");
        assert!(resp.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_bad_json_and_not_found() {
        let base = spawn_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/"))
            .header("Content-Type", "application/json")
            .body("{oops")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["error_type"], "JSON_DECODE_ERROR");

        let resp = client.get(format!("{base}/nope")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = client.get(format!("{base}{TRANSCRIPT_PATH}")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["method"], "POST");
    }

    #[tokio::test]
    async fn test_http_method_not_allowed_has_cors() {
        let base = spawn_server().await;
        let resp = reqwest::Client::new()
            .put(format!("{base}{TRANSCRIPT_PATH}"))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_type"], "SERVER_ERROR");
    }
}
