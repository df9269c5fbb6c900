//! Append-only request journal.
//!
//! Every inbound request gets exactly one [`JournalEntry`], appended when the
//! request arrives and completed with the status of the response actually
//! sent. Entries keep their arrival timestamp; completion only fills in the
//! status.
//!
//! The journal lives for the process and is never trimmed. It is an ordinary
//! value built in the composition root and handed to whoever needs it:
//!
//! ```rust
//! use brewgate::journal::Journal;
//!
//! let journal = Journal::new();
//! let entry = journal.record("GET", "/logs");
//! journal.finalize(entry, 200);
//!
//! assert_eq!(journal.list()[0].status, Some(200));
//! ```
//!
//! Nothing here can fail. The lock is a `parking_lot` mutex, which does not
//! poison, and it is never held across an `.await`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::handler::{BoxFuture, Handler};
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Json;
use crate::status::Status;

/// One request as seen by the journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub method: String,
    pub path: String,
    /// Arrival time.
    pub timestamp: DateTime<Utc>,
    /// `None` while the request is still in flight.
    pub status: Option<u16>,
}

/// Shared handle to the journal. Clones see the same entries.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pending entry for a request that just arrived.
    ///
    /// The timestamp is read under the lock, so list order and timestamp
    /// order agree.
    pub fn record(&self, method: &str, path: &str) -> PendingEntry {
        let (method, path) = (method.to_owned(), path.to_owned());

        let index = {
            let mut entries = self.entries.lock();
            entries.push(JournalEntry { method, path, timestamp: Utc::now(), status: None });
            entries.len() - 1
        };

        PendingEntry { journal: self.clone(), index, done: false }
    }

    /// Completes `entry` with the status of the response being sent.
    pub fn finalize(&self, entry: PendingEntry, status: u16) {
        entry.finalize(status);
    }

    /// Snapshot of every entry, oldest first.
    pub fn list(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Middleware that journals every request passing through it.
    pub fn layer(&self) -> JournalLayer {
        JournalLayer { journal: self.clone() }
    }

    /// Handler serving the journal as a JSON array.
    pub fn list_handler(&self) -> impl Handler {
        let journal = self.clone();
        move |_req: Request| {
            let entries = journal.list();
            async move { Json(entries) }
        }
    }

    fn set_status(&self, index: usize, status: u16) {
        if let Some(entry) = self.entries.lock().get_mut(index) {
            entry.status = Some(status);
        }
    }
}

/// An entry whose response has not been sent yet.
///
/// Dropping it unfinalized, which is what happens when the client disconnects
/// and the request future is dropped, records
/// [`Status::ClientClosedRequest`] so no entry is left without a status.
#[must_use = "a pending entry left alone is recorded as aborted"]
pub struct PendingEntry {
    journal: Journal,
    index: usize,
    done: bool,
}

impl PendingEntry {
    pub fn finalize(mut self, status: u16) {
        self.journal.set_status(self.index, status);
        self.done = true;
    }
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if !self.done {
            let aborted = Status::ClientClosedRequest.code();
            warn!(entry = self.index, status = aborted, "request ended before a response was sent");
            self.journal.set_status(self.index, aborted);
        }
    }
}

/// Journals each request and emits one `tracing` event per completed request.
pub struct JournalLayer {
    journal: Journal,
}

impl Middleware for JournalLayer {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let journal = self.journal.clone();
        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().to_string();
            let path = req.path().to_owned();
            let pending = journal.record(&method, &path);

            let res = next.run(req).await;

            let status = res.status_code();
            pending.finalize(status);
            info!(
                %method,
                %path,
                status,
                latency_ms = started.elapsed().as_millis() as u64,
                "request"
            );
            res
        })
    }
}
