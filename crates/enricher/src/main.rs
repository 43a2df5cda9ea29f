//! Reads raw `CollectorPayload` frames from the raw lane, runs them through
//! [`raw_processor::RawProcessor`], and writes the results onward: enriched
//! atomic events to the events lane, anything that couldn't be processed to
//! the errors lane. Modelled on `processing/enricher.py`'s `Enricher` plus
//! `processing/processor.py`'s `BaseProcessor.run()`.

mod sinks;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use config::{Config, PartialConfig};
use raw_processor::RawProcessor;
use transport::{Sink, TransportError};
use wire_codec::{CollectorPayload, ErrorPayload, Format};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(PartialConfig::default())?;
    telemetry::init(telemetry::stderr_log_handler);

    let format = match config.record_format {
        config::RecordFormat::Thrift => Format::Thrift,
        config::RecordFormat::Avro => Format::Avro,
    };

    let source = sinks::raw_source(&config).await?;
    let events_sink = sinks::events_sink(&config).await?;
    let errors_sink = sinks::errors_sink(&config).await?;
    let processor = Arc::new(RawProcessor::new(&config)?);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
        shutdown_signal.store(true, Ordering::SeqCst);
    });

    transport::run_loop(
        source,
        shutdown,
        POLL_INTERVAL,
        move |bytes: &[u8]| {
            CollectorPayload::decode(bytes, format)
                .map_err(|e| TransportError::Codec(e.to_string()))
        },
        {
            let errors_sink = errors_sink.clone();
            move |bytes: &[u8], e: TransportError| {
                let errors_sink = errors_sink.clone();
                let raw = bytes.to_vec();
                tokio::spawn(async move {
                    let error = ErrorPayload::new("unknown", format!("cannot decode message: {e}"))
                        .with_payload(raw);
                    if let Err(e) = errors_sink.write(vec![error.to_bytes()]).await {
                        tracing::error!(error = %e, "failed to write decode-failure error payload");
                    }
                });
            }
        },
        move |payloads: Vec<CollectorPayload>| {
            let processor = processor.clone();
            let events_sink = events_sink.clone();
            let errors_sink = errors_sink.clone();
            async move {
                let mut ok_flags = Vec::with_capacity(payloads.len());
                for payload in payloads {
                    let domain = payload.hostname.clone().unwrap_or_else(|| "unknown".to_string());
                    let raw_bytes = payload.encode(format);
                    match processor.process(payload).await {
                        Ok(events) => {
                            let records: Vec<Vec<u8>> = events
                                .iter()
                                .map(|e| serde_json::to_vec(e).expect("AtomicEvent always serializes"))
                                .collect();
                            if let Err(e) = events_sink.write(records).await {
                                tracing::error!(error = %e, "failed to write enriched events");
                                ok_flags.push(false);
                                continue;
                            }
                            ok_flags.push(true);
                        }
                        Err(e) => {
                            let error = ErrorPayload::new(domain, e.to_string()).with_payload(raw_bytes);
                            if let Err(write_err) = errors_sink.write(vec![error.to_bytes()]).await {
                                tracing::error!(error = %write_err, "failed to write process-failure error payload");
                            }
                            ok_flags.push(false);
                        }
                    }
                }
                ok_flags
            }
        },
    )
    .await?;

    Ok(())
}
