//! Maps raw transport and protocol faults onto [`SyncError`].
//!
//! This is the only place in the workspace that inspects concrete error
//! types. The whole `anyhow` cause chain is walked, so adapters are free to
//! add context on top of the original fault.

use std::io::ErrorKind;

use docshare_shared::SyncError;

use crate::source::HttpStatusError;

pub fn classify(err: &anyhow::Error) -> SyncError {
    for cause in err.chain() {
        if let Some(status) = cause.downcast_ref::<HttpStatusError>() {
            return SyncError::Api(status.code);
        }

        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if let Some(status) = e.status() {
                return SyncError::Api(status.as_u16());
            }
            if e.is_decode() {
                return SyncError::Unknown(e.to_string());
            }
            if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
                return SyncError::Network;
            }
        }

        if cause.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
            return SyncError::Network;
        }

        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if is_transport_kind(io.kind()) {
                return SyncError::Network;
            }
        }
    }

    SyncError::Unknown(err.to_string())
}

fn is_transport_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
            | ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn connectivity_fault_is_network() {
        let err = anyhow::Error::new(std::io::Error::new(
            ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(classify(&err), SyncError::Network);
    }

    #[test]
    fn status_is_preserved_through_context() {
        let err = Err::<(), _>(HttpStatusError::new(404))
            .context("GET /documents")
            .unwrap_err();
        assert_eq!(classify(&err), SyncError::Api(404));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_timeout_is_network() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert_eq!(classify(&anyhow::Error::new(elapsed)), SyncError::Network);
    }

    #[test]
    fn malformed_payload_is_unknown() {
        let parse = serde_json::from_str::<Vec<u8>>("{not json").unwrap_err();
        let err = anyhow::Error::new(parse);
        assert!(matches!(classify(&err), SyncError::Unknown(_)));
    }

    #[test]
    fn record_missing_id_is_unknown() {
        let parse = serde_json::from_str::<Vec<docshare_shared::CatalogRecord>>(
            r#"[{"title": "No id", "type": "exam"}]"#,
        )
        .unwrap_err();
        let err = anyhow::Error::new(parse).context("decoding documents");
        assert!(matches!(classify(&err), SyncError::Unknown(_)));
    }

    #[test]
    fn unrelated_io_error_is_unknown() {
        let err = anyhow::Error::new(std::io::Error::new(ErrorKind::InvalidData, "bad"));
        assert!(matches!(classify(&err), SyncError::Unknown(_)));
    }
}
