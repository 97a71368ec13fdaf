//! One export as a producer task plus a consumer loop.
//!
//! The producer streams and decodes the HTTP response into a bounded channel;
//! the caller's loop drains the channel into a [`RecordSink`]. The first error
//! from either side ends the export:
//! - a producer failure closes the channel; records already sent are still
//!   delivered, then the error is returned
//! - a sink failure or external cancellation cancels the producer, which
//!   aborts its in-flight HTTP read

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::analytics::{ApiClient, ExportRequest, Record, RecordKind};
use crate::config::EXPORT_CHANNEL_CAPACITY;
use crate::error_handling::SyncError;
use crate::sink::RecordSink;

/// Runs one export to completion and returns the number of records the sink
/// accepted.
///
/// Records reach the sink in response order, each exactly once. The call
/// only returns after the producer task has finished.
///
/// # Errors
///
/// The first error of the export: the producer's (request, status, decode),
/// the sink's, or `SyncError::Cancelled` when `cancel` fires.
pub async fn run_export<S>(
    api: &ApiClient,
    kind: RecordKind,
    request: ExportRequest,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<u64, SyncError>
where
    S: RecordSink + ?Sized,
{
    let token = cancel.child_token();
    let (tx, mut rx) = mpsc::channel::<Record>(EXPORT_CHANNEL_CAPACITY);

    let producer = {
        let api = api.clone();
        let token = token.clone();
        tokio::spawn(async move {
            // `tx` moves in and is dropped when the task ends, closing the channel
            api.export(kind, &request, &tx, &token).await
        })
    };

    let mut delivered = 0u64;
    let mut consumer_error: Option<SyncError> = None;
    loop {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            received = rx.recv() => received,
        };
        let Some(record) = received else {
            break;
        };

        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => Err(SyncError::Cancelled),
            sent = sink.send(record) => sent,
        };
        if let Err(e) = sent {
            consumer_error = Some(e);
            break;
        }
        delivered += 1;
    }

    if consumer_error.is_some() {
        token.cancel();
    }
    drop(rx);

    let produced = producer
        .await
        .map_err(|e| SyncError::TaskFailed(e.to_string()))?;

    if let Some(e) = consumer_error {
        warn!("{kind} export stopped by the row sink: {e}");
        return Err(e);
    }
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    let produced = produced?;
    debug!("{kind} export delivered {delivered} of {produced} records");
    Ok(delivered)
}
