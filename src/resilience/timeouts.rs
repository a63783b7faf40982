//! Timeout enforcement.
//!
//! Every relay call and probe has a deadline. Timeouts surface as
//! [`TransportError::Timeout`], distinct from connection errors.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Run `fut` with a deadline.
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_distinct() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, TransportError>(())
        };
        let err = with_timeout(Duration::from_secs(1), slow).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(d) if d == Duration::from_secs(1)));

        let fast = async { Ok::<_, TransportError>(7) };
        assert_eq!(with_timeout(Duration::from_secs(1), fast).await.unwrap(), 7);
    }
}
