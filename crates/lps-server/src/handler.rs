use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Json, Response};
use bytes::Bytes;

use lps_payload::{
    BodyInput, DataReferenceReader, DataReferenceWriter, MetadataReader, MetadataWriter,
    NewPayload, PayloadBody, JSON_CONTENT_TYPE,
};
use lps_protocol::{headers, CreatePayloadRequest, HealthResponse, OutgoingBody};
use lps_types::{DataChunk, DataReferenceDescriptor, ItemId, MetadataDocument, PayloadId};

use crate::error::{ServerError, ServerResult};
use crate::exchange::{
    header_str, is_json, json_reply, open_request, parse_json, partition, reply, signer, CallQuery,
};
use crate::state::AppState;

fn payload_id(raw: &str) -> ServerResult<PayloadId> {
    Ok(PayloadId::parse(raw)?)
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `POST /v1/payloads`
pub async fn create_payload(
    State(state): State<AppState>,
    CallQuery(params): CallQuery,
    request_headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let body = open_request(&state, &params, &request_headers, body)?;
    let request: CreatePayloadRequest = parse_json(&body)?;

    let mut new = NewPayload::new(request.partition_key, request.category);
    new.id = request.id;
    if let Some(data) = request.data {
        new.body = BodyInput::Json(data);
    }
    let payload = state.service.create(new, &state.shutdown).await?;
    json_reply(StatusCode::CREATED, &payload, signer)
}

/// `GET /v1/payloads/:id?partitionKey=`
pub async fn get_payload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let payload = state
        .service
        .get(&id, &partition(&params)?, &state.shutdown)
        .await?;
    json_reply(StatusCode::OK, &payload, signer)
}

/// `DELETE /v1/payloads/:id?partitionKey=`
pub async fn delete_payload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let summary = state
        .service
        .delete(&id, &partition(&params)?, &state.shutdown)
        .await?;
    json_reply(StatusCode::OK, &summary, signer)
}

/// `GET /v1/payloads/:id/body?partitionKey=[&raw=true]`
///
/// With `raw=true` the stored bytes are returned untouched, with their
/// `Content-Encoding`, and any signature covers those encoded bytes.
pub async fn get_body(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let partition = partition(&params)?;

    if params.raw {
        let raw = state
            .service
            .read_body_raw(&id, &partition, &state.shutdown)
            .await?;
        let storage = HeaderValue::from_str(&raw.storage.to_string())
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        let mut response = reply(
            StatusCode::OK,
            &raw.content_type,
            OutgoingBody::wire(raw.bytes, raw.encoding, signer),
        )?;
        response
            .headers_mut()
            .insert(HeaderName::from_static(headers::BODY_STORAGE), storage);
        return Ok(response);
    }

    match state
        .service
        .read_body(&id, &partition, &state.shutdown)
        .await?
    {
        PayloadBody::Empty => reply(
            StatusCode::NO_CONTENT,
            JSON_CONTENT_TYPE,
            OutgoingBody::wire(Bytes::new(), None, signer),
        ),
        PayloadBody::Json(value) => json_reply(StatusCode::OK, &value, signer),
        PayloadBody::Binary {
            content_type,
            bytes,
        } => reply(
            StatusCode::OK,
            &content_type,
            OutgoingBody::wire(bytes, None, signer),
        ),
    }
}

/// `PUT /v1/payloads/:id/body?partitionKey=`
///
/// JSON content types become JSON bodies; anything else is stored as binary
/// overflow under the supplied content type. An empty request clears the body.
pub async fn put_body(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
    request_headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let partition = partition(&params)?;
    let content_type = header_str(&request_headers, header::CONTENT_TYPE.as_str())
        .unwrap_or(JSON_CONTENT_TYPE)
        .to_string();
    let body = open_request(&state, &params, &request_headers, body)?;

    let input = if body.is_empty() {
        BodyInput::Empty
    } else if is_json(&content_type) {
        BodyInput::Json(parse_json(&body)?)
    } else {
        BodyInput::Binary {
            content_type,
            bytes: body,
        }
    };
    let payload = state
        .service
        .update_body(&id, &partition, input, &state.shutdown)
        .await?;
    json_reply(StatusCode::OK, &payload, signer)
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// `POST /v1/payloads/:id/metadata?partitionKey=` with a JSON array body.
pub async fn add_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
    request_headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let partition = partition(&params)?;
    let body = open_request(&state, &params, &request_headers, body)?;
    let records: Vec<MetadataDocument> = parse_json(&body)?;

    let items = state
        .client
        .add_metadata(&id, &partition, records.as_slice(), &state.shutdown)
        .await?;
    json_reply(StatusCode::CREATED, &items, signer)
}

/// `GET /v1/payloads/:id/metadata[?continuationToken=]`
pub async fn list_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let chunk = state
        .client
        .list_metadata(&id, params.continuation().as_ref(), &state.shutdown)
        .await?;
    json_reply(StatusCode::OK, &chunk, signer)
}

/// `GET /v1/payloads/:id/metadata/:item_id`
pub async fn get_metadata(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    CallQuery(params): CallQuery,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let item_id = ItemId::parse(&item_id)?;
    let item = state
        .client
        .get_metadata(&id, &item_id, &state.shutdown)
        .await?;
    json_reply(StatusCode::OK, &item, signer)
}

// ---------------------------------------------------------------------------
// Data references
// ---------------------------------------------------------------------------

/// `POST /v1/payloads/:id/data-references?partitionKey=` with a JSON array body.
pub async fn add_data_references(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
    request_headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;
    let partition = partition(&params)?;
    let body = open_request(&state, &params, &request_headers, body)?;
    let references: Vec<DataReferenceDescriptor> = parse_json(&body)?;

    let items = state
        .client
        .add_data_references(&id, &partition, references.as_slice(), &state.shutdown)
        .await?;
    json_reply(StatusCode::CREATED, &items, signer)
}

/// `GET /v1/payloads/:id/data-references[?continuationToken=][&providedId=]`
///
/// With `providedId` every match is returned in a single final chunk.
pub async fn list_data_references(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallQuery(params): CallQuery,
) -> ServerResult<Response> {
    let signer = signer(&state, &params)?;
    let id = payload_id(&id)?;

    let chunk = match params.provided_id.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(provided_id) => DataChunk::last(
            state
                .client
                .find_data_references(&id, provided_id, &state.shutdown)
                .await?,
        ),
        None => {
            state
                .client
                .list_data_references(&id, params.continuation().as_ref(), &state.shutdown)
                .await?
        }
    };
    json_reply(StatusCode::OK, &chunk, signer)
}
