//! Retry policy: decide whether a failed attempt is worth repeating.

use crate::HandlerError;
use remote_api_client::{ApiError, NetworkErrorKind};
use sync_database::OperationKind;

/// Outcome of classifying a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Eligible for a later drain, still bounded by `max_retries`.
    Retry,
    /// Stop retrying; the operation fails now.
    Terminal,
}

/// Classify a handler failure.
///
/// `retry_count` is the number of failed attempts before this one.
pub fn classify(error: &HandlerError, kind: OperationKind, retry_count: u32) -> RetryDecision {
    match error {
        HandlerError::Api(api) => classify_api(api, kind, retry_count),
        HandlerError::Store(_) => RetryDecision::Retry,
        HandlerError::InvalidPayload(_) | HandlerError::MissingContent(_) => {
            RetryDecision::Terminal
        }
    }
}

fn classify_api(error: &ApiError, kind: OperationKind, retry_count: u32) -> RetryDecision {
    match error {
        ApiError::Network {
            kind:
                NetworkErrorKind::NotConnected
                | NetworkErrorKind::ConnectionLost
                | NetworkErrorKind::TimedOut,
            ..
        } => RetryDecision::Retry,
        ApiError::ServerError(_) => RetryDecision::Retry,
        ApiError::Unauthorized
        | ApiError::Forbidden
        | ApiError::ClientError(_)
        | ApiError::InvalidRequest(_) => RetryDecision::Terminal,
        // The unpublish handler turns NotFound into success before we get here.
        ApiError::NotFound => RetryDecision::Terminal,
        // On publish this is a duplicate public id: it needs a new id, not
        // the same payload again.
        ApiError::Conflict if kind == OperationKind::Publish => RetryDecision::Terminal,
        ApiError::Conflict => retry_once(retry_count),
        ApiError::InvalidResponse(_)
        | ApiError::Network {
            kind: NetworkErrorKind::Other,
            ..
        } => retry_once(retry_count),
    }
}

fn retry_once(retry_count: u32) -> RetryDecision {
    if retry_count == 0 {
        RetryDecision::Retry
    } else {
        RetryDecision::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_database::DatabaseError;

    fn api(err: ApiError) -> HandlerError {
        HandlerError::Api(err)
    }

    #[test]
    fn transient_transport_errors_retry() {
        for kind in [
            NetworkErrorKind::NotConnected,
            NetworkErrorKind::ConnectionLost,
            NetworkErrorKind::TimedOut,
        ] {
            let err = api(ApiError::network(kind, "offline"));
            assert_eq!(classify(&err, OperationKind::Publish, 2), RetryDecision::Retry);
        }
        assert_eq!(
            classify(&api(ApiError::ServerError(503)), OperationKind::Unpublish, 1),
            RetryDecision::Retry
        );
    }

    #[test]
    fn client_and_auth_errors_are_terminal() {
        for err in [
            ApiError::Unauthorized,
            ApiError::Forbidden,
            ApiError::ClientError(422),
            ApiError::Conflict,
        ] {
            assert_eq!(
                classify(&api(err), OperationKind::Publish, 0),
                RetryDecision::Terminal
            );
        }
    }

    #[test]
    fn unknown_errors_retry_only_once() {
        let err = api(ApiError::InvalidResponse("truncated body".into()));
        assert_eq!(classify(&err, OperationKind::PublishUpdate, 0), RetryDecision::Retry);
        assert_eq!(classify(&err, OperationKind::PublishUpdate, 1), RetryDecision::Terminal);

        let err = api(ApiError::network(NetworkErrorKind::Other, "tls"));
        assert_eq!(classify(&err, OperationKind::Publish, 0), RetryDecision::Retry);
        assert_eq!(classify(&err, OperationKind::Publish, 1), RetryDecision::Terminal);
    }

    #[test]
    fn conflict_outside_publish_retries_once() {
        let err = api(ApiError::Conflict);
        assert_eq!(classify(&err, OperationKind::CharterUpsert, 0), RetryDecision::Retry);
        assert_eq!(classify(&err, OperationKind::CharterUpsert, 1), RetryDecision::Terminal);
    }

    #[test]
    fn local_failures() {
        let store = HandlerError::Store(DatabaseError::Migration("locked".into()));
        assert_eq!(classify(&store, OperationKind::Publish, 1), RetryDecision::Retry);

        let payload = HandlerError::InvalidPayload("eof".into());
        assert_eq!(classify(&payload, OperationKind::Publish, 0), RetryDecision::Terminal);

        let missing = HandlerError::MissingContent("item-1".into());
        assert_eq!(
            classify(&missing, OperationKind::CharterUpsert, 0),
            RetryDecision::Terminal
        );
    }
}
