//! Row sinks: where decoded records go.
//!
//! A sink receives records one at a time and may block; while it does, the
//! export stops reading the HTTP body. Records reach a sink in response order.
//! A table's cursor is only committed after [`RecordSink::flush`] succeeded.

use std::io::{self, Write};

use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::analytics::Record;
use crate::config::WRITER_CHANNEL_CAPACITY;
use crate::error_handling::SyncError;

/// Destination of synced rows.
#[async_trait]
pub trait RecordSink: Send {
    /// Accepts one record. An error stops the export that produced it.
    async fn send(&mut self, record: Record) -> Result<(), SyncError>;

    /// Makes every accepted record durable. Called once per table, after the
    /// export drained and before its cursor is committed.
    async fn flush(&mut self) -> Result<(), SyncError> {
        Ok(())
    }
}

/// Hands records to a host-owned channel; the receiver is responsible for
/// persisting them.
#[async_trait]
impl RecordSink for mpsc::Sender<Record> {
    async fn send(&mut self, record: Record) -> Result<(), SyncError> {
        mpsc::Sender::send(&*self, record)
            .await
            .map_err(|_| SyncError::Sink("record channel closed".to_string()))
    }
}

#[async_trait]
impl RecordSink for Vec<Record> {
    async fn send(&mut self, record: Record) -> Result<(), SyncError> {
        self.push(record);
        Ok(())
    }
}

/// Writes each record as one JSON line: `table`, the typed fields and a
/// `metadata` object.
pub struct JsonlSink {
    writer: Box<dyn Write + Send>,
    written: u64,
}

impl JsonlSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Serializes and writes one record.
    pub fn write_record(&mut self, record: &Record) -> Result<(), SyncError> {
        let row = record
            .to_row()
            .map_err(|e| SyncError::Sink(format!("failed to serialize row: {e}")))?;
        self.write_row(&row)
    }

    fn write_row(&mut self, row: &Value) -> Result<(), SyncError> {
        serde_json::to_writer(&mut self.writer, row)
            .map_err(|e| SyncError::Sink(format!("failed to serialize row: {e}")))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| SyncError::Sink(format!("failed to write row: {e}")))?;
        self.written += 1;
        Ok(())
    }

    fn flush_writer(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn flush_error(e: &io::Error) -> SyncError {
    SyncError::Sink(format!("failed to flush output: {e}"))
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn send(&mut self, record: Record) -> Result<(), SyncError> {
        self.write_record(&record)
    }

    async fn flush(&mut self) -> Result<(), SyncError> {
        self.flush_writer().map_err(|e| flush_error(&e))
    }
}

enum WriterCommand {
    Write(Record),
    Flush(oneshot::Sender<Result<(), SyncError>>),
}

/// Handle to a running JSONL writer task. Clones share the task.
///
/// [`RecordSink::flush`] waits until the task has written and flushed every
/// record sent through this handle before it.
#[derive(Clone)]
pub struct JsonlWriter {
    tx: mpsc::Sender<WriterCommand>,
}

fn writer_stopped() -> SyncError {
    SyncError::Sink("JSONL writer stopped".to_string())
}

#[async_trait]
impl RecordSink for JsonlWriter {
    async fn send(&mut self, record: Record) -> Result<(), SyncError> {
        self.tx
            .send(WriterCommand::Write(record))
            .await
            .map_err(|_| writer_stopped())
    }

    async fn flush(&mut self) -> Result<(), SyncError> {
        let (reply, flushed) = oneshot::channel();
        self.tx
            .send(WriterCommand::Flush(reply))
            .await
            .map_err(|_| writer_stopped())?;
        flushed.await.map_err(|_| writer_stopped())?
    }
}

/// Starts a writer that drains records into `sink` on a blocking thread.
///
/// Several table syncs can share the returned handle. The task stops at the
/// first write or flush error; otherwise it ends once every handle is
/// dropped, flushes, and yields the number of rows written.
pub fn start_jsonl_writer(
    mut sink: JsonlSink,
) -> (JsonlWriter, JoinHandle<Result<u64, SyncError>>) {
    let (tx, mut rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);

    let handle = tokio::task::spawn_blocking(move || {
        while let Some(command) = rx.blocking_recv() {
            match command {
                WriterCommand::Write(record) => {
                    if let Err(e) = sink.write_record(&record) {
                        error!("JSONL writer stopped: {e}");
                        return Err(e);
                    }
                }
                WriterCommand::Flush(reply) => {
                    if let Err(e) = sink.flush_writer() {
                        error!("JSONL writer stopped: {}", flush_error(&e));
                        // The table waiting on the reply fails too
                        let _ = reply.send(Err(flush_error(&e)));
                        return Err(flush_error(&e));
                    }
                    let _ = reply.send(Ok(()));
                }
            }
        }
        sink.flush_writer().map_err(|e| flush_error(&e))?;
        debug!("JSONL writer finished after {} rows", sink.written());
        Ok(sink.written())
    });

    (JsonlWriter { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::analytics::{decode_line, RecordKind};

    /// `Write` handle over a shared buffer so tests can read what was written.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn page_view(uuid: &str) -> Record {
        let line = format!(
            r#"{{"hostname":"example.com","uuid":"{uuid}","path":"/","metadata.plan_text":"pro"}}"#
        );
        decode_line(RecordKind::PageViews, line.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_vec_sink_keeps_order() {
        let mut sink: Vec<Record> = Vec::new();
        sink.send(page_view("a")).await.unwrap();
        sink.send(page_view("b")).await.unwrap();
        let uuids: Vec<_> = sink
            .iter()
            .map(|r| r.primary_key().unwrap()[1].to_string())
            .collect();
        assert_eq!(uuids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_closed_channel_sink_errors() {
        let (mut tx, rx) = mpsc::channel::<Record>(1);
        drop(rx);
        let err = RecordSink::send(&mut tx, page_view("a")).await.unwrap_err();
        assert!(matches!(err, SyncError::Sink(_)));
    }

    #[tokio::test]
    async fn test_jsonl_sink_writes_one_line_per_record() {
        let buf = SharedBuf::default();
        let mut sink = JsonlSink::new(Box::new(buf.clone()));
        sink.send(page_view("a")).await.unwrap();
        sink.send(page_view("b")).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["table"], "simple_analytics_page_views");
        assert_eq!(lines[1]["uuid"], "b");
        assert_eq!(lines[0]["metadata"]["plan_text"], "pro");
    }

    #[tokio::test]
    async fn test_writer_task_drains_all_handles() {
        let buf = SharedBuf::default();
        let (mut writer, handle) = start_jsonl_writer(JsonlSink::new(Box::new(buf.clone())));

        let mut other = writer.clone();
        writer.send(page_view("a")).await.unwrap();
        other.send(page_view("b")).await.unwrap();
        drop(writer);
        drop(other);

        assert_eq!(handle.await.unwrap().unwrap(), 2);
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_writer_flush_waits_for_queued_records() {
        let buf = SharedBuf::default();
        let (mut writer, handle) = start_jsonl_writer(JsonlSink::new(Box::new(
            std::io::BufWriter::new(buf.clone()),
        )));

        writer.send(page_view("a")).await.unwrap();
        writer.send(page_view("b")).await.unwrap();
        writer.flush().await.unwrap();
        // Visible before the writer task ends
        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.lines().count(), 2);

        drop(writer);
        assert_eq!(handle.await.unwrap().unwrap(), 2);
    }

    /// Accepts writes but fails every flush, like a full disk behind a buffer.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("no space left on device"))
        }
    }

    #[tokio::test]
    async fn test_writer_flush_reports_output_failure() {
        let (mut writer, handle) = start_jsonl_writer(JsonlSink::new(Box::new(FullDisk)));

        writer.send(page_view("a")).await.unwrap();
        let err = writer.flush().await.unwrap_err();
        assert!(err.to_string().contains("failed to flush output"), "got {err}");

        assert!(handle.await.unwrap().is_err());
        // The task has stopped, so the handle is unusable afterwards
        assert!(matches!(
            writer.send(page_view("b")).await,
            Err(SyncError::Sink(_))
        ));
    }

    #[tokio::test]
    async fn test_vec_sink_flush_is_a_no_op() {
        let mut sink: Vec<Record> = Vec::new();
        sink.send(page_view("a")).await.unwrap();
        assert!(sink.flush().await.is_ok());
        assert_eq!(sink.len(), 1);
    }
}
