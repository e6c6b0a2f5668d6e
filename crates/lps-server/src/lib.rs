//! HTTP server for the localization payload store.
//!
//! Serves the payload, metadata and data-reference API over HTTP with
//! opt-in per-call body signing.

pub mod config;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ServerConfig, SigningConfig, SigningKeys};
pub use error::{ServerError, ServerResult};
pub use server::LpsServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use axum::Router;
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use lps_crypto::SigningKey;
    use lps_protocol::{headers, sign_body, verify_body};
    use lps_types::{ContentEncoding, PayloadId};

    fn app(config: &ServerConfig) -> Router {
        router::build_router(AppState::in_memory(config).unwrap())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn json_of(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    async fn create(app: &Router, partition: &str, data: Value) -> String {
        let (status, _, body) = send(
            app,
            post_json(
                "/v1/payloads",
                &json!({"partitionKey": partition, "category": "Default", "data": data}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        json_of(&body)["id"].as_str().unwrap().to_string()
    }

    struct Keys {
        server: SigningKey,
        client: SigningKey,
    }

    fn signed_config() -> (ServerConfig, Keys) {
        let keys = Keys {
            server: SigningKey::generate(),
            client: SigningKey::generate(),
        };
        let mut config = ServerConfig::default();
        config.signing = SigningConfig {
            server_key_hex: Some(keys.server.to_hex()),
            trusted_client_key_hex: Some(keys.client.verifying_key().to_hex()),
        };
        (config, keys)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = app(&ServerConfig::default());
        let (status, _, body) = send(&app, get("/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn payload_lifecycle_with_cascade() {
        let app = app(&ServerConfig::default());
        let id = create(&app, "p1", json!({"hello": "world"})).await;

        let (status, _, body) = send(&app, get(&format!("/v1/payloads/{id}?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["data"], json!({"hello": "world"}));

        let (status, _, body) = send(&app, get(&format!("/v1/payloads/{id}/body?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body), json!({"hello": "world"}));

        let (status, _, _) = send(
            &app,
            post_json(
                &format!("/v1/payloads/{id}/metadata?partitionKey=p1"),
                &json!([{"source": "crowdin"}, {"source": "manual"}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, body) = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/payloads/{id}?partitionKey=p1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["metadataRemoved"], 2);

        let (status, _, body) = send(&app, get(&format!("/v1/payloads/{id}?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_of(&body)["kind"], "not_found");

        let (_, _, body) = send(&app, get(&format!("/v1/payloads/{id}/metadata"))).await;
        assert_eq!(json_of(&body)["items"], json!([]));
    }

    #[tokio::test]
    async fn wrong_partition_is_not_found() {
        let app = app(&ServerConfig::default());
        let id = create(&app, "p1", Value::Null).await;
        let (status, _, _) = send(&app, get(&format!("/v1/payloads/{id}?partitionKey=p2"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let app = app(&ServerConfig::default());
        let id = PayloadId::new().to_string();
        let request = json!({"id": id, "partitionKey": "p1", "category": "Default"});
        let (status, _, _) = send(&app, post_json("/v1/payloads", &request)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _, body) = send(&app, post_json("/v1/payloads", &request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json_of(&body)["kind"], "conflict");
    }

    #[tokio::test]
    async fn malformed_requests_are_bad_requests() {
        let app = app(&ServerConfig::default());
        let (status, _, _) = send(&app, get("/v1/payloads/not-an-id?partitionKey=p1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = create(&app, "p1", Value::Null).await;
        let (status, _, body) = send(&app, get(&format!("/v1/payloads/{id}"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["kind"], "invalid_argument");

        let (status, _, _) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/v1/payloads")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_query_gets_json_error_body() {
        let app = app(&ServerConfig::default());
        let id = create(&app, "p1", Value::Null).await;
        let (status, response_headers, body) = send(
            &app,
            get(&format!("/v1/payloads/{id}?partitionKey=p1&requireSignature=yes")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response_headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(json_of(&body)["kind"], "invalid_argument");
    }

    #[tokio::test]
    async fn compressed_body_expanding_past_limit_is_rejected() {
        let app = app(&ServerConfig::default());
        let id = PayloadId::new().to_string();
        let logical = serde_json::to_vec(&json!({
            "id": id,
            "partitionKey": "p1",
            "category": "Default",
            "data": {"text": "a".repeat(lps_protocol::MAX_BODY_SIZE)},
        }))
        .unwrap();
        let wire = lps_blob::encode(ContentEncoding::Zstd, &logical, 3).unwrap();
        assert!(wire.len() < 1024 * 1024);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/payloads")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_ENCODING, "zstd")
            .body(Body::from(wire))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["kind"], "invalid_argument");

        let (status, _, _) = send(&app, get(&format!("/v1/payloads/{id}?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -----------------------------------------------------------------------
    // Signed exchanges
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn signed_request_round_trip() {
        let (config, keys) = signed_config();
        let app = app(&config);
        let body = serde_json::to_vec(&json!({"partitionKey": "p1", "category": "Default"})).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/v1/payloads?requireSignature=true")
            .header(headers::SIGNATURE, sign_body(&keys.client, &body))
            .body(Body::from(body))
            .unwrap();
        let (status, response_headers, response_body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let signature = response_headers
            .get(headers::SIGNATURE)
            .and_then(|v| v.to_str().ok());
        verify_body(&keys.server.verifying_key(), &response_body, signature).unwrap();
    }

    #[tokio::test]
    async fn unsigned_or_tampered_request_is_rejected() {
        let (config, keys) = signed_config();
        let app = app(&config);
        let id = PayloadId::new().to_string();
        let body = serde_json::to_vec(&json!({"id": id, "partitionKey": "p1", "category": "Default"}))
            .unwrap();

        let unsigned = Request::builder()
            .method("POST")
            .uri("/v1/payloads?requireSignature=true")
            .body(Body::from(body.clone()))
            .unwrap();
        let (status, _, response) = send(&app, unsigned).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json_of(&response)["kind"], "integrity_failure");

        let mut tampered = body.clone();
        tampered.push(b' ');
        let request = Request::builder()
            .method("POST")
            .uri("/v1/payloads?requireSignature=true")
            .header(headers::SIGNATURE, sign_body(&keys.client, &body))
            .body(Body::from(tampered))
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(&app, get(&format!("/v1/payloads/{id}?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn signature_is_ignored_unless_requested() {
        let (config, _) = signed_config();
        let app = app(&config);
        let request = Request::builder()
            .method("POST")
            .uri("/v1/payloads")
            .header(headers::SIGNATURE, "garbage")
            .body(Body::from(r#"{"partitionKey":"p1","category":"Default"}"#))
            .unwrap();
        let (status, response_headers, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!response_headers.contains_key(headers::SIGNATURE));
    }

    #[tokio::test]
    async fn signing_without_server_key_fails_before_work() {
        let app = app(&ServerConfig::default());
        let id = PayloadId::new().to_string();
        let request = post_json(
            "/v1/payloads?requireSignature=true",
            &json!({"id": id, "partitionKey": "p1", "category": "Default"}),
        );
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(&app, get(&format!("/v1/payloads/{id}?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn raw_overflow_body_is_signed_over_encoded_bytes() {
        let (mut config, keys) = signed_config();
        config.payload.max_inline_bytes = 64;
        let app = app(&config);
        let data = json!({"text": "a".repeat(4096)});
        let id = create(&app, "p1", data.clone()).await;

        let (status, response_headers, body) = send(
            &app,
            get(&format!("/v1/payloads/{id}/body?partitionKey=p1&raw=true&requireSignature=true")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response_headers[header::CONTENT_ENCODING], "zstd");
        assert_eq!(response_headers[headers::BODY_STORAGE], "blob-overflow");
        let signature = response_headers
            .get(headers::SIGNATURE)
            .and_then(|v| v.to_str().ok());
        verify_body(&keys.server.verifying_key(), &body, signature).unwrap();

        let decoded = lps_blob::decode(ContentEncoding::Zstd, &body).unwrap();
        assert_eq!(json_of(&decoded), data);

        let (_, _, logical) = send(&app, get(&format!("/v1/payloads/{id}/body?partitionKey=p1"))).await;
        assert_eq!(json_of(&logical), data);
    }

    #[tokio::test]
    async fn binary_body_replaces_json() {
        let app = app(&ServerConfig::default());
        let id = create(&app, "p1", json!({"v": 1})).await;
        let bytes = vec![0u8, 159, 146, 150, 255];

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/v1/payloads/{id}/body?partitionKey=p1"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(bytes.clone()))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json_of(&body).get("data").is_none());

        let (status, response_headers, body) =
            send(&app, get(&format!("/v1/payloads/{id}/body?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response_headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(body.as_ref(), bytes.as_slice());

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/v1/payloads/{id}/body?partitionKey=p1"))
            .body(Body::empty())
            .unwrap();
        send(&app, request).await;
        let (status, _, _) = send(&app, get(&format!("/v1/payloads/{id}/body?partitionKey=p1"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    // -----------------------------------------------------------------------
    // Child collections
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn metadata_pages_with_continuation_tokens() {
        let mut config = ServerConfig::default();
        config.payload.page_size = Some(2);
        let app = app(&config);
        let id = create(&app, "p1", Value::Null).await;
        let records: Vec<Value> = (0..5).map(|i| json!({"n": i})).collect();
        send(
            &app,
            post_json(&format!("/v1/payloads/{id}/metadata?partitionKey=p1"), &json!(records)),
        )
        .await;

        let mut seen = Vec::new();
        let mut uri = format!("/v1/payloads/{id}/metadata");
        loop {
            let (status, _, body) = send(&app, get(&uri)).await;
            assert_eq!(status, StatusCode::OK);
            let chunk = json_of(&body);
            let items = chunk["items"].as_array().unwrap().clone();
            assert!(items.len() <= 2);
            seen.extend(items);
            match chunk["continuationToken"].as_str() {
                Some(token) => {
                    uri = format!("/v1/payloads/{id}/metadata?continuationToken={token}");
                }
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);

        let item_id = seen[0]["id"].as_str().unwrap();
        let (status, _, body) =
            send(&app, get(&format!("/v1/payloads/{id}/metadata/{item_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["id"], item_id);
    }

    #[tokio::test]
    async fn data_references_filter_by_provided_id() {
        let app = app(&ServerConfig::default());
        let id = create(&app, "p1", Value::Null).await;
        let (status, _, _) = send(
            &app,
            post_json(
                &format!("/v1/payloads/{id}/data-references?partitionKey=p1"),
                &json!([
                    {"groupId": "checkout", "locale": "ja-JP"},
                    {"groupId": "checkout", "locale": "de-DE"},
                    {"groupId": "profile", "locale": "ja-JP"}
                ]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, _, body) = send(
            &app,
            get(&format!("/v1/payloads/{id}/data-references?providedId=checkout")),
        )
        .await;
        let chunk = json_of(&body);
        assert_eq!(chunk["items"].as_array().unwrap().len(), 2);
        assert!(chunk.get("continuationToken").map_or(true, Value::is_null));

        let (_, _, body) = send(&app, get(&format!("/v1/payloads/{id}/data-references"))).await;
        assert_eq!(json_of(&body)["items"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn children_of_missing_payload_are_rejected_on_write() {
        let app = app(&ServerConfig::default());
        let id = PayloadId::new();
        let (status, _, _) = send(
            &app,
            post_json(
                &format!("/v1/payloads/{id}/metadata?partitionKey=p1"),
                &json!([{"a": 1}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
