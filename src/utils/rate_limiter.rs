use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration, Instant};

use crate::models::error::Error;

/// Caps concurrent OpenF1 requests and spaces them out.
#[derive(Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    last_request: Arc<tokio::sync::Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_delay_ms: u64) -> Self {
        RateLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_delay: Duration::from_millis(min_delay_ms),
            last_request: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Waits for a free slot. The slot is released when the guard drops.
    pub async fn acquire(&self) -> Result<RateLimitGuard, Error> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::LimiterClosed)?;

        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }
        *last_request = Some(Instant::now());
        drop(last_request);

        Ok(RateLimitGuard {
            _permit: Some(permit),
        })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

pub struct RateLimitGuard {
    _permit: Option<tokio::sync::OwnedSemaphorePermit>,
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        tracing::trace!("Rate limit permit released");
    }
}
