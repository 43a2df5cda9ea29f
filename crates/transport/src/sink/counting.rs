//! Wraps any [`Sink`] with the hard-bail error counter from spec §5: a write
//! failure increments an error count; once more than
//! `MAX_ERRORS_PER_INTERVAL` failures land within a 60s window, the process
//! is expected to self-terminate. Each concrete sink in the source
//! (`connectors/sinks/{kafka,sqs,firehose}.py`) carries its own copy of this
//! counter; here it's factored once and composed around any `Sink`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::Sink;
use crate::error::TransportError;

const COUNTER_RESET_INTERVAL: Duration = Duration::from_secs(60);
const MAX_ERRORS_PER_INTERVAL: u64 = 10;

/// Called when the error threshold is exceeded. Defaults to
/// `std::process::exit(1)`; tests inject a counting hook instead so they
/// don't tear down the test process.
pub trait HardBail: Send + Sync {
    fn bail(&self);
}

struct ProcessExit;
impl HardBail for ProcessExit {
    fn bail(&self) {
        tracing::error!("too many sink write failures in this interval, exiting");
        std::process::exit(1);
    }
}

pub struct CountingSink<S> {
    inner: S,
    ok: AtomicU64,
    err: AtomicU64,
    last_reset: Mutex<Instant>,
    on_bail: Box<dyn HardBail>,
}

impl<S: Sink> CountingSink<S> {
    pub fn new(inner: S) -> Self {
        CountingSink {
            inner,
            ok: AtomicU64::new(0),
            err: AtomicU64::new(0),
            last_reset: Mutex::new(Instant::now()),
            on_bail: Box::new(ProcessExit),
        }
    }

    /// Test/embedding hook: substitute what happens when the threshold trips.
    pub fn with_hard_bail(inner: S, on_bail: Box<dyn HardBail>) -> Self {
        CountingSink { on_bail, ..Self::new(inner) }
    }

    fn maybe_reset(&self) {
        let mut last_reset = self.last_reset.lock().expect("counting sink lock poisoned");
        if last_reset.elapsed() > COUNTER_RESET_INTERVAL {
            self.ok.store(0, Ordering::SeqCst);
            self.err.store(0, Ordering::SeqCst);
            *last_reset = Instant::now();
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn ok_count(&self) -> u64 {
        self.ok.load(Ordering::SeqCst)
    }

    pub fn err_count(&self) -> u64 {
        self.err.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Sink> Sink for CountingSink<S> {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        self.maybe_reset();
        match self.inner.write(batch).await {
            Ok(n) => {
                self.ok.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            }
            Err(e) => {
                let errs = self.err.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::warn!(error = %e, err_count = errs, "sink write failed");
                if errs > MAX_ERRORS_PER_INTERVAL {
                    self.on_bail.bail();
                }
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct AlwaysFails;

    #[async_trait]
    impl Sink for AlwaysFails {
        async fn write(&self, _batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
            Err(TransportError::Sqs("boom".to_string()))
        }
        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct CountingBail(Arc<AtomicUsize>);
    impl HardBail for CountingBail {
        fn bail(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_hard_bail_fires_after_threshold_failures() {
        let bail_count = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink::with_hard_bail(AlwaysFails, Box::new(CountingBail(bail_count.clone())));

        for _ in 0..10 {
            let _ = sink.write(vec![b"x".to_vec()]).await;
        }
        assert_eq!(bail_count.load(Ordering::SeqCst), 0);

        let _ = sink.write(vec![b"x".to_vec()]).await;
        assert_eq!(bail_count.load(Ordering::SeqCst), 1);
    }
}
