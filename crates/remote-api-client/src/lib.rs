//! Client for the Anchorline content backend.
//!
//! [`RemoteApi`] is the seam the sync engine talks to; [`HttpRemoteApi`] is
//! the production implementation over HTTPS + JSON with a bearer token.
//! Every failure is mapped into the [`ApiError`] taxonomy so callers can
//! classify it without looking at transport details.

mod api;
mod error;
mod http;

pub use api::{
    CharterRequest, CharterResponse, PublishRequest, PublishResponse, RemoteApi,
    UpdatePublishedRequest, UpdatePublishedResponse,
};
pub use error::{error_for_status, ApiError, ApiResult, NetworkErrorKind};
pub use http::HttpRemoteApi;
