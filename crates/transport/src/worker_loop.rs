//! The polymorphic read/decode/process/ack loop shared by raw, atomic-event
//! and error consumers (spec §4.6), modelled on `processing/enricher.py`'s
//! `Enricher.run()`: read a bounded batch, decode, hand decoded values to an
//! implementer-supplied processor, ack every source message regardless of
//! outcome, log counts.
//!
//! Writing results onward to a sink is the processor's job, not the loop's
//! — spec §4.6 calls `process()` "the implementer hook", and a raw-lane
//! processor (atomic events + errors) has a different fan-out shape than an
//! events- or errors-lane processor (single sink). Decode failures are
//! reported through `on_decode_failure` rather than hardcoded into an
//! errors-sink write, for the same reason.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::source::Source;

/// Runs until `shutdown` is set. `decode` turns one frame's bytes into `T`;
/// failures are reported via `on_decode_failure` and excluded from the batch
/// handed to `process`. `process` returns one success flag per decoded
/// value, used only for the summary log line — it's expected to have
/// already written its own outputs to the right sink(s).
pub async fn run_loop<S, T, Decode, OnDecodeFailure, Process, Fut>(
    mut source: S,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
    decode: Decode,
    mut on_decode_failure: OnDecodeFailure,
    mut process: Process,
) -> Result<(), TransportError>
where
    S: Source,
    Decode: Fn(&[u8]) -> Result<T, TransportError>,
    OnDecodeFailure: FnMut(&[u8], TransportError),
    Process: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Vec<bool>>,
{
    while !shutdown.load(Ordering::SeqCst) {
        let batch = source.read().await?;
        if batch.is_empty() {
            tokio::time::sleep(poll_interval).await;
            continue;
        }

        let mut decoded = Vec::with_capacity(batch.len());
        let mut decode_failures = 0usize;
        for message in &batch {
            match decode(&message.bytes) {
                Ok(value) => decoded.push(value),
                Err(e) => {
                    decode_failures += 1;
                    on_decode_failure(&message.bytes, e);
                }
            }
        }

        let results = process(decoded).await;
        let ok = results.iter().filter(|r| **r).count();
        tracing::info!(
            batch_size = batch.len(),
            decode_failures,
            ok,
            err = results.len() - ok,
            "processed batch"
        );

        for message in batch {
            message.ack().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::DevSource;

    #[tokio::test]
    async fn test_acks_every_message_regardless_of_process_outcome() {
        let source = DevSource::new(vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let errors = Arc::new(std::sync::Mutex::new(Vec::new()));
        let errors_clone = errors.clone();

        let handle = tokio::spawn(run_loop(
            source,
            shutdown,
            Duration::from_millis(10),
            |bytes: &[u8]| Ok::<_, TransportError>(bytes.to_vec()),
            |_bytes, _e| {},
            move |decoded: Vec<Vec<u8>>| {
                let errors_clone = errors_clone.clone();
                async move {
                    decoded
                        .into_iter()
                        .map(|v| {
                            let ok = v != b"2";
                            if !ok {
                                errors_clone.lock().unwrap().push(v);
                            }
                            ok
                        })
                        .collect()
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_clone.store(true, Ordering::SeqCst);
        handle.await.unwrap().unwrap();

        assert_eq!(errors.lock().unwrap().as_slice(), &[b"2".to_vec()]);
    }
}
