//! Remote API error taxonomy.

use thiserror::Error;

/// Transport-level failure flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The host could not be reached at all.
    NotConnected,
    /// The connection dropped mid-request.
    ConnectionLost,
    TimedOut,
    Other,
}

/// Failure returned by every [`RemoteApi`](crate::RemoteApi) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Duplicate public id on publish.
    #[error("conflict")]
    Conflict,

    #[error("client error: HTTP {0}")]
    ClientError(u16),

    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// The server answered but the body was not what we expected.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built (bad base URL, unusable path).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error ({kind:?}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },
}

impl ApiError {
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound => Some(404),
            Self::Conflict => Some(409),
            Self::ClientError(code) | Self::ServerError(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::InvalidResponse(err.to_string());
        }
        if err.is_builder() {
            return Self::InvalidRequest(err.to_string());
        }
        let kind = if err.is_timeout() {
            NetworkErrorKind::TimedOut
        } else if err.is_connect() {
            NetworkErrorKind::NotConnected
        } else if err.is_request() || err.is_body() {
            NetworkErrorKind::ConnectionLost
        } else {
            NetworkErrorKind::Other
        };
        Self::network(kind, err.to_string())
    }
}

/// Map a non-success HTTP status to an [`ApiError`].
pub fn error_for_status(status: u16) -> ApiError {
    match status {
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound,
        409 => ApiError::Conflict,
        400..=499 => ApiError::ClientError(status),
        500..=599 => ApiError::ServerError(status),
        other => ApiError::InvalidResponse(format!("unexpected HTTP status {other}")),
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        assert_eq!(error_for_status(401), ApiError::Unauthorized);
        assert_eq!(error_for_status(403), ApiError::Forbidden);
        assert_eq!(error_for_status(404), ApiError::NotFound);
        assert_eq!(error_for_status(409), ApiError::Conflict);
        assert_eq!(error_for_status(422), ApiError::ClientError(422));
        assert_eq!(error_for_status(503), ApiError::ServerError(503));
        assert!(matches!(
            error_for_status(302),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_status_code_roundtrip() {
        for code in [401, 403, 404, 409, 418, 500, 502] {
            assert_eq!(error_for_status(code).status_code(), Some(code));
        }
        assert_eq!(
            ApiError::network(NetworkErrorKind::TimedOut, "slow").status_code(),
            None
        );
    }

    #[test]
    fn test_display() {
        let err = ApiError::network(NetworkErrorKind::NotConnected, "offline");
        assert_eq!(err.to_string(), "network error (NotConnected): offline");
        assert_eq!(ApiError::ServerError(502).to_string(), "server error: HTTP 502");
    }
}
