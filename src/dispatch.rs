//! Offload blocking core calls from async callers.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("operation did not finish within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("blocking task panicked: {0}")]
    Panicked(String),
}

/// Run `f` on the blocking pool, giving up after `deadline`.
///
/// A timed-out task is not killed: it runs to completion in the background
/// and its result is dropped. Core calls bound their own child processes.
pub async fn offload<F, T>(deadline: Option<Duration>, f: F) -> Result<T, DispatchError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(f);

    let joined = match deadline {
        Some(limit) => tokio::time::timeout(limit, handle)
            .await
            .map_err(|_| DispatchError::Timeout(limit))?,
        None => handle.await,
    };

    joined.map_err(|e| DispatchError::Panicked(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value_of_blocking_work() {
        let v = offload(Some(Duration::from_secs(5)), || 40 + 2).await.unwrap();
        assert_eq!(v, 42);
    }

    #[tokio::test]
    async fn deadline_expiry_is_reported() {
        let err = offload(Some(Duration::from_millis(50)), || {
            std::thread::sleep(Duration::from_millis(500));
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(_)));
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let err = offload(None, || -> u32 { panic!("boom") }).await.unwrap_err();
        assert!(matches!(err, DispatchError::Panicked(_)));
    }
}
