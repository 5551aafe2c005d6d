//! Process-wide backend throttling.
//!
//! Two independent limits apply to every call: a semaphore caps how many completions are in
//! flight, and a sliding one-minute window caps how many may start per minute. Callers over
//! either limit wait for a slot instead of failing.

use super::{CompletionRequest, LlmClient, LlmClientError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Decorator that enforces concurrency and requests-per-window ceilings on an inner client.
pub struct ThrottledClient<C> {
    inner: C,
    in_flight: Semaphore,
    max_per_window: usize,
    window: Duration,
    started: Mutex<VecDeque<Instant>>,
}

impl<C> ThrottledClient<C> {
    /// Wrap `inner`, allowing `max_concurrency` simultaneous calls and `max_rpm` starts per minute.
    pub fn new(inner: C, max_concurrency: usize, max_rpm: u32) -> Self {
        Self::with_window(inner, max_concurrency, max_rpm as usize, RATE_WINDOW)
    }

    pub(crate) fn with_window(
        inner: C,
        max_concurrency: usize,
        max_per_window: usize,
        window: Duration,
    ) -> Self {
        Self {
            inner,
            in_flight: Semaphore::new(max_concurrency.max(1)),
            max_per_window: max_per_window.max(1),
            window,
            started: Mutex::new(VecDeque::new()),
        }
    }

    async fn wait_for_rate_slot(&self) {
        loop {
            let wait = {
                let mut started = self.started.lock().await;
                let now = Instant::now();
                while started
                    .front()
                    .is_some_and(|first| now.duration_since(*first) >= self.window)
                {
                    started.pop_front();
                }

                match started.front() {
                    Some(first) if started.len() >= self.max_per_window => {
                        self.window - now.duration_since(*first)
                    }
                    _ => {
                        started.push_back(now);
                        return;
                    }
                }
            };

            tracing::debug!(wait_ms = wait.as_millis() as u64, "LLM rate limit reached; waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl<C> LlmClient for ThrottledClient<C>
where
    C: LlmClient,
{
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmClientError> {
        let _permit = self.in_flight.acquire().await.map_err(|_| {
            LlmClientError::ProviderUnavailable("LLM throttle has been shut down".into())
        })?;
        self.wait_for_rate_slot().await;
        self.inner.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SlowClient {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmClientError> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now_active, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok("ok".into())
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test".into(),
            system_prompt: String::new(),
            prompt: "prompt".into(),
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_cap() {
        let inner = Arc::new(SlowClient::default());
        let throttled = Arc::new(ThrottledClient::new(inner.clone(), 2, 1_000));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let throttled = throttled.clone();
            handles.push(tokio::spawn(
                async move { throttled.complete(request()).await },
            ));
        }
        for handle in handles {
            handle.await.expect("join").expect("completion");
        }

        assert_eq!(inner.calls.load(Ordering::SeqCst), 8);
        assert!(inner.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_window_once_rate_ceiling_is_hit() {
        let inner = Arc::new(SlowClient::default());
        let throttled = ThrottledClient::with_window(inner.clone(), 4, 2, Duration::from_secs(60));

        let started = Instant::now();
        throttled.complete(request()).await.expect("first");
        throttled.complete(request()).await.expect("second");
        assert!(started.elapsed() < Duration::from_secs(1));

        throttled.complete(request()).await.expect("third");
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
