//! # berth-core
//!
//! Foundation vocabulary for the Berth SDK: the error hierarchy, the
//! immutable request/response model, best-effort bearer-token decoding,
//! and the capability traits the session core consumes.
//!
//! - **Errors**: [`BerthError`] and its kinds, via `thiserror`
//! - **Requests**: immutable [`Request`] descriptors and [`Response`]s
//! - **Tokens**: [`Jwt`] payload view (decode only, no verification)
//! - **Storage**: [`Storage`] trait with memory and file backends
//! - **Transport**: [`Transport`] trait implemented by HTTP clients

#![deny(unsafe_code)]

pub mod errors;
pub mod jwt;
pub mod request;
pub mod storage;
pub mod transport;

pub use errors::{
    BerthError, ClientError, DecodeError, Result, ServiceError, ServiceErrorCode, StorageError,
    TransportError,
};
pub use jwt::Jwt;
pub use request::{Request, RequestBuilder, Response, TokenPolicy};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use transport::Transport;
