// crates/launch-harness-core/src/capture.rs
// ============================================================================
// Module: Stream Capture
// Description: Bounded capture of child stdout/stderr.
// Purpose: Drain pipes concurrently and flag truncation explicitly.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! Each child stream is drained by its own task into a shared buffer, so the
//! bytes read so far stay available even when the task is aborted after a
//! timeout. When a cap is configured the pipe keeps being drained past the
//! cap (the child must never block on a full pipe) but the excess bytes are
//! discarded and the stream is marked truncated. A pipe abandoned before end
//! of file (descendants still holding it when the drain budget runs out) is
//! marked incomplete instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Read chunk size for pipe draining.
const READ_CHUNK_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bytes captured from one child stream.
///
/// # Invariants
/// - `truncated` is true only when a cap dropped bytes.
/// - `incomplete` is true only when capture stopped before end of file.
/// - `total_bytes >= bytes.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    /// Captured bytes (at most the configured cap).
    pub bytes: Vec<u8>,
    /// Total bytes the child wrote, including discarded ones.
    pub total_bytes: u64,
    /// Set when bytes beyond the cap were discarded.
    pub truncated: bool,
    /// Set when the pipe was abandoned before end of file.
    pub incomplete: bool,
}

impl CapturedStream {
    /// Returns the captured bytes as lossy UTF-8 text.
    #[must_use]
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Returns true when nothing was captured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends a chunk, honoring `limit`.
    fn append(&mut self, chunk: &[u8], limit: Option<usize>) {
        self.total_bytes = self.total_bytes.saturating_add(chunk.len() as u64);
        let room = limit.map_or(chunk.len(), |limit| limit.saturating_sub(self.bytes.len()));
        let take = room.min(chunk.len());
        self.bytes.extend_from_slice(&chunk[..take]);
        if take < chunk.len() {
            self.truncated = true;
        }
    }
}

/// Output captured from a child, complete or partial.
///
/// Returned inside [`InvocationResult`](crate::InvocationResult) on success
/// and inside [`HarnessError`](crate::HarnessError) on timeout or capture
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Captured standard output.
    pub stdout: CapturedStream,
    /// Captured standard error.
    pub stderr: CapturedStream,
    /// Wall-clock time from spawn to the end of capture.
    pub duration: Duration,
}

// ============================================================================
// SECTION: Shared Capture
// ============================================================================

/// Capture buffer shared between a drain task and the runner.
#[derive(Debug, Clone)]
pub(crate) struct SharedCapture {
    /// Buffer guarded for cross-task access.
    inner: Arc<Mutex<CapturedStream>>,
    /// Optional per-stream cap in bytes.
    limit: Option<usize>,
    /// Set once the drain task reaches end of file.
    finished: Arc<AtomicBool>,
}

impl SharedCapture {
    /// Creates an empty capture with an optional cap.
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CapturedStream::default())),
            limit,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a copy of everything captured so far.
    pub(crate) fn snapshot(&self) -> CapturedStream {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Flags the stream incomplete unless its drain reached end of file.
    pub(crate) fn mark_abandoned(&self) {
        if !self.finished.load(Ordering::Acquire) {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner).incomplete = true;
        }
    }

    /// Appends a chunk to the shared buffer.
    fn push(&self, chunk: &[u8]) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).append(chunk, self.limit);
    }

    /// Drains `reader` to EOF into the shared buffer.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when a read fails; bytes read before
    /// the failure remain in the buffer.
    pub(crate) async fn drain<R>(self, mut reader: R) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let read = reader.read(&mut chunk).await?;
            if read == 0 {
                self.finished.store(true, Ordering::Release);
                return Ok(());
            }
            self.push(&chunk[..read]);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
