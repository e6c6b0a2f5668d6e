//! Request opening and response signing for handlers.
//!
//! A call opts into signing with `requireSignature=true`. The request body is
//! then verified against the trusted client key before it is decoded, and
//! the response is signed with the server key over the exact bytes sent.

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use lps_crypto::SigningKey;
use lps_payload::JSON_CONTENT_TYPE;
use lps_protocol::{headers, open_body, parse_encoding, CallParams, OutgoingBody, ProtocolError};
use lps_types::PartitionKey;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Query parameters shared by every call. Rejections use the JSON error body.
#[derive(Debug, Clone, Default)]
pub struct CallQuery(pub CallParams);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallQuery {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<CallParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;
        Ok(Self(params))
    }
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The response signer for this call, or `None` when signing was not asked for.
///
/// Handlers resolve this before touching the service.
pub fn signer<'a>(state: &'a AppState, params: &CallParams) -> ServerResult<Option<&'a SigningKey>> {
    if !params.require_signature {
        return Ok(None);
    }
    state
        .keys
        .server
        .as_ref()
        .map(Some)
        .ok_or_else(|| ProtocolError::KeyNotConfigured("signing").into())
}

/// Verify (when required) and decode a request body.
pub fn open_request(
    state: &AppState,
    params: &CallParams,
    request_headers: &HeaderMap,
    body: Bytes,
) -> ServerResult<Bytes> {
    let encoding = parse_encoding(header_str(request_headers, header::CONTENT_ENCODING.as_str()))?;
    let opened = open_body(
        body,
        encoding,
        header_str(request_headers, headers::SIGNATURE),
        state.keys.trusted_client.as_ref(),
        params.require_signature,
    )?;
    Ok(opened)
}

pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> ServerResult<T> {
    serde_json::from_slice(bytes).map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

pub fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|m| m.eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}

pub fn partition(params: &CallParams) -> ServerResult<PartitionKey> {
    let raw = params
        .partition_key
        .as_deref()
        .ok_or_else(|| ServerError::BadRequest("partitionKey is required".into()))?;
    Ok(PartitionKey::new(raw)?)
}

fn header_value(value: &str) -> ServerResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ServerError::Internal(e.to_string()))
}

/// Build a response from a body already in wire form.
pub fn reply(status: StatusCode, content_type: &str, out: OutgoingBody) -> ServerResult<Response> {
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CONTENT_TYPE, header_value(content_type)?);
    if let Some(encoding) = out.encoding {
        response_headers.insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(encoding.as_str()),
        );
    }
    if let Some(signature) = &out.signature {
        response_headers.insert(
            HeaderName::from_static(headers::SIGNATURE),
            header_value(signature)?,
        );
    }
    Ok((status, response_headers, out.bytes).into_response())
}

pub fn json_reply<T: Serialize>(
    status: StatusCode,
    value: &T,
    signer: Option<&SigningKey>,
) -> ServerResult<Response> {
    reply(status, JSON_CONTENT_TYPE, OutgoingBody::json(value, signer)?)
}
