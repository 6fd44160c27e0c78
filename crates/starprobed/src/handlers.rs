//! HTTP handlers for the measurement endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use starprobe_core::download::{self, NO_CACHE_HEADERS};
use starprobe_core::probe::{ProbeAck, latency_probe};
use starprobe_core::upload::StreamChunkSource;
use starprobe_core::{
    ByteStreamRequest, ClientAddress, NetworkInfo, RandomByteStream, UploadBody, UploadResult,
    resolve_client_address,
};
use std::net::SocketAddr;
use tracing::debug;

/// Query parameters for `GET /test/download/`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    /// Requested size, kept raw so garbage falls back to the default
    pub size: Option<String>,
}

/// Latency probe: an empty 204, nothing else.
pub async fn ping() -> StatusCode {
    let ProbeAck = latency_probe();
    StatusCode::NO_CONTENT
}

/// Stream incompressible random bytes.
///
/// The size is never an error: missing or malformed values get the default,
/// out-of-range values are clamped.
pub async fn download(
    State(state): State<AppState>,
    params: Result<Query<DownloadParams>, QueryRejection>,
) -> Response {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let request = ByteStreamRequest::from_query(params.size.as_deref());
    let stream = RandomByteStream::for_request(&request, &state.config.download);
    let total = stream.total_len();

    debug!(requested = ?request.requested_size, bytes = total, "Serving download");

    let mut response = Body::from_stream(stream.into_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(download::CONTENT_TYPE));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(total));
    for &(name, value) in NO_CACHE_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    response
}

/// Drain the request body and report server-side throughput.
pub async fn upload(State(state): State<AppState>, body: Body) -> ApiResult<Json<UploadResult>> {
    let source = StreamChunkSource::new(body.into_data_stream());
    let result = state.uploads.consume(UploadBody::chunked(source)).await?;
    Ok(Json(result))
}

/// Classify the caller's network.
pub async fn network_info(State(state): State<AppState>, request: Request) -> Json<NetworkInfo> {
    let address = client_address(&request, state.trust_forwarded);
    Json(state.classifier.classify(address).await)
}

/// Client address for a request: the first forwarded hop when trusted,
/// otherwise the transport peer.
fn client_address(request: &Request, trust_forwarded: bool) -> Option<ClientAddress> {
    let forwarded_for = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    resolve_client_address(forwarded_for, peer, trust_forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(forwarded: Option<&str>, peer: Option<SocketAddr>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/test/network-info/");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(addr) = peer {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn test_forwarded_header_wins_when_trusted() {
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        let request = request_with(Some("203.0.113.5, 10.0.0.2"), Some(peer));

        assert_eq!(
            client_address(&request, true),
            Some(ClientAddress::new("203.0.113.5"))
        );
        assert_eq!(
            client_address(&request, false),
            Some(ClientAddress::new("10.0.0.1"))
        );
    }

    #[test]
    fn test_peer_fallback_and_absence() {
        let peer: SocketAddr = "[::1]:443".parse().unwrap();
        assert_eq!(
            client_address(&request_with(None, Some(peer)), true),
            Some(ClientAddress::new("::1"))
        );
        assert_eq!(client_address(&request_with(None, None), true), None);
    }
}
