//! Chunk pump bridging backend chunk streams to HTTP response bodies.
//!
//! The pump is a pull-based adapter: hyper polls it for the next body frame,
//! it polls the backend chunk stream, so backpressure is inherent and at most
//! one chunk is in flight per session. Every session ends in an explicit
//! terminal outcome rather than a swallowed exception:
//!
//! - `Completed` - the source was exhausted after exactly the declared length
//! - `Aborted` - the client went away before completion (the response body
//!   was dropped mid-stream); a normal termination, not a fault
//! - `BackendFailed` - the source errored or ended short after headers were
//!   committed; nothing further can be signalled to the client, so the body
//!   is terminated abruptly and the failure is only logged
//!
//! Chunks are forwarded strictly in arrival order, and the pump never yields
//! more bytes than the declared length, so the body always matches the
//! `Content-Length` the framer emitted.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::watch;
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::backend::ChunkStream;

/// Terminal state of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Body still being pumped.
    Streaming,
    /// All declared bytes were written.
    Completed,
    /// The client disconnected before completion.
    Aborted,
    /// The chunk source failed or ran short mid-stream.
    BackendFailed,
}

/// Last observed pump state, published on every terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpStatus {
    pub outcome: StreamOutcome,
    pub bytes_sent: u64,
}

/// Observer handle for a pump's terminal outcome.
pub struct PumpHandle {
    rx: watch::Receiver<PumpStatus>,
}

impl PumpHandle {
    /// Current pump status.
    pub fn status(&self) -> PumpStatus {
        *self.rx.borrow()
    }

    /// Waits until the session reaches a terminal outcome.
    pub async fn wait_terminal(&mut self) -> PumpStatus {
        loop {
            let status = *self.rx.borrow();
            if status.outcome != StreamOutcome::Streaming {
                return status;
            }
            if self.rx.changed().await.is_err() {
                return *self.rx.borrow();
            }
        }
    }
}

/// Pumps a backend chunk stream into an HTTP body, enforcing the declared
/// length and reporting a terminal [`StreamOutcome`].
///
/// Consumed via `axum::body::Body::from_stream`; dropping the pump before
/// completion is how client disconnects manifest and is handled in `Drop`.
pub struct StreamPump {
    source: ChunkStream,
    expected: u64,
    sent: u64,
    finished: bool,
    status_tx: watch::Sender<PumpStatus>,
    /// Bound on each individual chunk fetch; `None` leaves fetches unbounded.
    chunk_timeout: Option<Duration>,
    /// Armed while a fetch is outstanding, cleared when a chunk arrives.
    fetch_deadline: Option<Pin<Box<Sleep>>>,
}

impl StreamPump {
    /// Wraps a chunk stream that is expected to deliver exactly `length`
    /// bytes. Returns the pump and an observer handle for tests and
    /// bookkeeping.
    pub fn new(source: ChunkStream, length: u64) -> (Self, PumpHandle) {
        let (status_tx, rx) = watch::channel(PumpStatus {
            outcome: StreamOutcome::Streaming,
            bytes_sent: 0,
        });
        (
            Self {
                source,
                expected: length,
                sent: 0,
                finished: false,
                status_tx,
                chunk_timeout: None,
                fetch_deadline: None,
            },
            PumpHandle { rx },
        )
    }

    /// Like [`StreamPump::new`], additionally bounding every individual
    /// chunk fetch so a backend that hangs mid-stream cannot suspend the
    /// session indefinitely. Expiry terminates the body as a backend
    /// failure.
    pub fn new_with_chunk_timeout(
        source: ChunkStream,
        length: u64,
        timeout: Duration,
    ) -> (Self, PumpHandle) {
        let (mut pump, handle) = Self::new(source, length);
        pump.chunk_timeout = Some(timeout);
        (pump, handle)
    }

    /// Bytes forwarded to the client so far.
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    fn finish(&mut self, outcome: StreamOutcome) {
        self.finished = true;
        let _ = self.status_tx.send(PumpStatus {
            outcome,
            bytes_sent: self.sent,
        });
    }
}

impl Stream for StreamPump {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            if this.sent >= this.expected {
                this.finish(StreamOutcome::Completed);
                return Poll::Ready(None);
            }

            match this.source.as_mut().poll_next(cx) {
                Poll::Pending => {
                    if let Some(timeout) = this.chunk_timeout {
                        let deadline = this
                            .fetch_deadline
                            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                        if deadline.as_mut().poll(cx).is_ready() {
                            warn!(
                                sent = this.sent,
                                timeout_ms = timeout.as_millis() as u64,
                                "chunk fetch timed out mid-stream, terminating body"
                            );
                            this.finish(StreamOutcome::BackendFailed);
                            return Poll::Ready(Some(Err(io::Error::new(
                                io::ErrorKind::TimedOut,
                                "chunk fetch timed out",
                            ))));
                        }
                    }
                    return Poll::Pending;
                }
                Poll::Ready(None) => {
                    // Source contract violated: ended short of the declared
                    // length after headers were already committed.
                    warn!(
                        sent = this.sent,
                        expected = this.expected,
                        "chunk source ended before declared length"
                    );
                    this.finish(StreamOutcome::BackendFailed);
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "chunk source truncated",
                    ))));
                }
                Poll::Ready(Some(Err(error))) => {
                    warn!(
                        error = %error,
                        sent = this.sent,
                        "backend failed mid-stream, terminating body"
                    );
                    this.finish(StreamOutcome::BackendFailed);
                    return Poll::Ready(Some(Err(io::Error::other(error.to_string()))));
                }
                Poll::Ready(Some(Ok(mut chunk))) => {
                    this.fetch_deadline = None;
                    let remaining = this.expected - this.sent;
                    if chunk.len() as u64 > remaining {
                        chunk.truncate(remaining as usize);
                    }
                    if chunk.is_empty() {
                        continue;
                    }
                    this.sent += chunk.len() as u64;
                    if this.sent >= this.expected {
                        // Mark completion as soon as the final bytes are
                        // handed over, whether or not we get polled again.
                        this.finish(StreamOutcome::Completed);
                    }
                    return Poll::Ready(Some(Ok(chunk)));
                }
            }
        }
    }
}

impl Drop for StreamPump {
    fn drop(&mut self) {
        if !self.finished {
            // The common case of a user seeking or closing the player; an
            // outcome, not a fault.
            debug!(
                sent = self.sent,
                expected = self.expected,
                "client disconnected before stream completion"
            );
            self.finish(StreamOutcome::Aborted);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::{StreamExt, stream};

    use super::*;
    use crate::backend::BackendError;

    fn chunk_source(chunks: Vec<Result<Bytes, BackendError>>) -> ChunkStream {
        stream::iter(chunks).boxed()
    }

    /// Chunk stream that counts how often it is polled for a new item.
    struct CountingSource {
        inner: ChunkStream,
        polls: Arc<AtomicUsize>,
    }

    impl Stream for CountingSource {
        type Item = Result<Bytes, BackendError>;

        fn poll_next(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<Option<Self::Item>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.inner.as_mut().poll_next(cx)
        }
    }

    #[tokio::test]
    async fn test_pump_completes_with_exact_length() {
        let source = chunk_source(vec![
            Ok(Bytes::from(vec![1u8; 40])),
            Ok(Bytes::from(vec![2u8; 40])),
            Ok(Bytes::from(vec![3u8; 20])),
        ]);
        let (pump, mut handle) = StreamPump::new(source, 100);

        let chunks: Vec<Bytes> = pump.map(|item| item.unwrap()).collect().await;
        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total, 100);

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::Completed);
        assert_eq!(status.bytes_sent, 100);
    }

    #[tokio::test]
    async fn test_pump_preserves_chunk_order() {
        let source = chunk_source(vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
            Ok(Bytes::from_static(b"gh")),
        ]);
        let (pump, _handle) = StreamPump::new(source, 8);

        let body: Vec<u8> = pump
            .map(|item| item.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat();
        assert_eq!(body, b"abcdefgh");
    }

    #[tokio::test]
    async fn test_pump_truncates_overlong_source() {
        let source = chunk_source(vec![
            Ok(Bytes::from(vec![1u8; 60])),
            Ok(Bytes::from(vec![2u8; 60])),
            Ok(Bytes::from(vec![3u8; 60])),
        ]);
        let (pump, mut handle) = StreamPump::new(source, 100);

        let chunks: Vec<Bytes> = pump.map(|item| item.unwrap()).collect().await;
        let total: usize = chunks.iter().map(Bytes::len).sum();
        // Never more than the declared Content-Length
        assert_eq!(total, 100);

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::Completed);
    }

    #[tokio::test]
    async fn test_pump_reports_backend_failure() {
        let source = chunk_source(vec![
            Ok(Bytes::from(vec![1u8; 40])),
            Err(BackendError::Transport {
                reason: "connection reset".to_string(),
            }),
        ]);
        let (mut pump, mut handle) = StreamPump::new(source, 100);

        assert!(pump.next().await.unwrap().is_ok());
        let error = pump.next().await.unwrap().unwrap_err();
        assert!(error.to_string().contains("connection reset"));
        assert!(pump.next().await.is_none());

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::BackendFailed);
        assert_eq!(status.bytes_sent, 40);
    }

    #[tokio::test]
    async fn test_pump_reports_short_source_as_failure() {
        let source = chunk_source(vec![Ok(Bytes::from(vec![1u8; 40]))]);
        let (mut pump, mut handle) = StreamPump::new(source, 100);

        assert!(pump.next().await.unwrap().is_ok());
        let error = pump.next().await.unwrap().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::BackendFailed);
    }

    #[tokio::test]
    async fn test_pump_skips_empty_chunks() {
        let source = chunk_source(vec![
            Ok(Bytes::new()),
            Ok(Bytes::from(vec![1u8; 10])),
            Ok(Bytes::new()),
            Ok(Bytes::from(vec![2u8; 10])),
        ]);
        let (pump, mut handle) = StreamPump::new(source, 20);

        let chunks: Vec<Bytes> = pump.map(|item| item.unwrap()).collect().await;
        assert!(chunks.iter().all(|c| !c.is_empty()));

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::Completed);
    }

    #[tokio::test]
    async fn test_drop_mid_stream_is_aborted_and_stops_fetching() {
        let polls = Arc::new(AtomicUsize::new(0));
        let inner = chunk_source(vec![
            Ok(Bytes::from(vec![1u8; 10])),
            Ok(Bytes::from(vec![2u8; 10])),
            Ok(Bytes::from(vec![3u8; 10])),
            Ok(Bytes::from(vec![4u8; 10])),
        ]);
        let counting = CountingSource {
            inner,
            polls: polls.clone(),
        };
        let (mut pump, mut handle) = StreamPump::new(counting.boxed(), 40);

        // Simulate the client going away after two chunks: hyper drops the
        // body stream.
        assert!(pump.next().await.unwrap().is_ok());
        assert!(pump.next().await.unwrap().is_ok());
        assert_eq!(pump.bytes_sent(), 20);
        assert_eq!(handle.status().outcome, StreamOutcome::Streaming);
        let polls_before_drop = polls.load(Ordering::SeqCst);
        drop(pump);

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::Aborted);
        assert_eq!(status.bytes_sent, 20);
        // No further chunks may be drawn from the backend after the drop.
        assert_eq!(polls.load(Ordering::SeqCst), polls_before_drop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_chunk_fetch_times_out_as_backend_failure() {
        // One chunk arrives, then the backend hangs forever.
        let stalled: ChunkStream = stream::iter(vec![Ok(Bytes::from(vec![1u8; 10]))])
            .chain(stream::pending())
            .boxed();
        let (mut pump, mut handle) =
            StreamPump::new_with_chunk_timeout(stalled, 100, Duration::from_secs(5));

        assert!(pump.next().await.unwrap().is_ok());
        let error = pump.next().await.unwrap().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::TimedOut);
        assert!(pump.next().await.is_none());

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::BackendFailed);
        assert_eq!(status.bytes_sent, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_timeout_rearms_per_fetch() {
        // Each fetch stays under the bound, so a slow-but-live backend is
        // never cut off even when the session outlasts a single timeout.
        let slow: ChunkStream = stream::iter(vec![0u8, 1, 2, 3])
            .then(|byte| async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(Bytes::from(vec![byte; 10]))
            })
            .boxed();
        let (pump, mut handle) =
            StreamPump::new_with_chunk_timeout(slow, 40, Duration::from_secs(5));

        let chunks: Vec<Bytes> = pump.map(|item| item.unwrap()).collect().await;
        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total, 40);

        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::Completed);
    }

    #[tokio::test]
    async fn test_zero_length_pump_completes_immediately() {
        let source = chunk_source(vec![]);
        let (mut pump, mut handle) = StreamPump::new(source, 0);

        assert!(pump.next().await.is_none());
        let status = handle.wait_terminal().await;
        assert_eq!(status.outcome, StreamOutcome::Completed);
        assert_eq!(status.bytes_sent, 0);
    }
}
