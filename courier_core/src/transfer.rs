//! Registry of in-flight uploads and downloads.
//!
//! Entries are keyed by a per-call [`TransferId`], so two transfers to the
//! same URL never share callbacks. Callbacks run outside the registry lock.

use bytes::Bytes;
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::error::CourierError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TransferId(Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Upload,
    Download,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Progress {
    pub direction: Direction,
    /// Cumulative bytes moved so far.
    pub bytes_done: u64,
    /// Expected size; `None` when the transport does not know it.
    pub bytes_total: Option<u64>,
    /// Bytes moved by the event that produced this snapshot.
    pub chunk: u64,
}

impl Progress {
    /// Completed fraction in `[0, 1]`; `None` while the total is unknown or zero.
    pub fn fraction(&self) -> Option<f32> {
        match self.bytes_total {
            Some(total) if total > 0 => {
                Some((self.bytes_done as f64 / total as f64).clamp(0.0, 1.0) as f32)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn is_indeterminate(&self) -> bool {
        self.fraction().is_none()
    }

    /// Human readable expected size ("1.5 MB"), or bytes done when the total is unknown.
    pub fn size_display(&self) -> String {
        format_size(self.bytes_total.unwrap_or(self.bytes_done))
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// What a finished transfer produced.
#[derive(Clone, Debug)]
pub enum TransferOutput {
    Uploaded { status: StatusCode, body: Bytes },
    Downloaded { path: PathBuf, bytes: u64 },
}

pub type TransferResult = Result<TransferOutput, CourierError>;
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;
pub type CompletionFn = Box<dyn FnOnce(TransferResult) + Send>;

/// Caller side of a registered transfer.
#[derive(Clone, Debug)]
pub struct TransferHandle {
    id: TransferId,
    url: Url,
    token: CancellationToken,
    tracker: Arc<TransferTracker>,
}

impl TransferHandle {
    #[inline]
    pub fn id(&self) -> TransferId {
        self.id
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Drops the registry entry and stops the transfer; no callback fires afterwards.
    pub fn cancel(&self) {
        self.tracker.cancel(self.id);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[inline]
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

struct Entry {
    url: Url,
    direction: Direction,
    token: CancellationToken,
    on_progress: Option<ProgressFn>,
    on_complete: CompletionFn,
}

#[derive(Default)]
pub struct TransferTracker {
    inner: Mutex<HashMap<TransferId, Entry>>,
}

impl fmt::Debug for TransferTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferTracker")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl TransferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransferId, Entry>> {
        // A panicking callback never runs under this lock, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(
        self: &Arc<Self>,
        url: Url,
        direction: Direction,
        on_progress: Option<ProgressFn>,
        on_complete: CompletionFn,
    ) -> TransferHandle {
        let id = TransferId::new();
        let token = CancellationToken::new();
        self.lock().insert(
            id,
            Entry {
                url: url.clone(),
                direction,
                token: token.clone(),
                on_progress,
                on_complete,
            },
        );
        tracing::debug!(target: "courier::transfer", %id, %url, ?direction, "transfer registered");
        TransferHandle {
            id,
            url,
            token,
            tracker: Arc::clone(self),
        }
    }

    /// No-op once the transfer completed or was cancelled.
    pub fn progress(&self, id: TransferId, bytes_done: u64, bytes_total: Option<u64>) {
        self.progress_chunk(id, bytes_done, bytes_total, 0);
    }

    pub(crate) fn progress_chunk(
        &self,
        id: TransferId,
        bytes_done: u64,
        bytes_total: Option<u64>,
        chunk: u64,
    ) {
        let (direction, callback) = {
            let guard = self.lock();
            match guard.get(&id) {
                Some(e) => (e.direction, e.on_progress.clone()),
                None => return,
            }
        };
        if let Some(cb) = callback {
            cb(Progress {
                direction,
                bytes_done,
                bytes_total,
                chunk,
            });
        }
    }

    /// Removes the entry, then invokes its completion callback. Returns `false`
    /// when the transfer was already completed or cancelled.
    pub fn complete(&self, id: TransferId, result: TransferResult) -> bool {
        let Some(entry) = self.lock().remove(&id) else {
            return false;
        };
        match &result {
            Ok(_) => tracing::debug!(target: "courier::transfer", %id, url = %entry.url, "transfer completed"),
            Err(e) => tracing::debug!(target: "courier::transfer", %id, url = %entry.url, error = %e, "transfer failed"),
        }
        (entry.on_complete)(result);
        true
    }

    pub fn cancel(&self, id: TransferId) -> bool {
        let Some(entry) = self.lock().remove(&id) else {
            return false;
        };
        entry.token.cancel();
        tracing::debug!(target: "courier::transfer", %id, url = %entry.url, "transfer cancelled");
        true
    }

    pub fn contains(&self, id: TransferId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
