use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Run `fut` with a deadline. An elapsed deadline becomes an ordinary error
/// so callers apply the same degrade-or-surface handling as for transport failures.
pub async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{what} timed out after {:.1}s", limit.as_secs_f64())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_an_error() {
        let err = bounded(Duration::from_secs(1), "judge call", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("judge call timed out"));
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        let v = bounded(Duration::from_secs(1), "x", async { Ok(7) }).await.unwrap();
        assert_eq!(v, 7);
        let e = bounded::<(), _>(Duration::from_secs(1), "x", async { Err(anyhow!("boom")) })
            .await
            .unwrap_err();
        assert_eq!(e.to_string(), "boom");
    }
}
