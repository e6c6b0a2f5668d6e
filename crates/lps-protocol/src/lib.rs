//! Wire protocol for the localization payload store.
//!
//! Defines endpoint paths, header and query names, request/response
//! messages, and the opt-in body signing protocol used between LPS clients
//! and servers.

pub mod endpoint;
pub mod error;
pub mod message;
pub mod signing;

pub use endpoint::{endpoints, headers, params, HealthResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{CallParams, CreatePayloadRequest, ErrorResponse, MAX_BODY_SIZE, PROTOCOL_VERSION};
pub use signing::{
    open_body, open_body_within, parse_encoding, sign_body, verify_body, IntegrityError, OutgoingBody,
};
