//! Pending-call table
//!
//! Maps the correlation id of every outstanding request to the completion
//! slot of the caller waiting on it. The table also holds the outbound writer
//! of the current session: while it is absent (handshake not finished, or the
//! socket was torn down) no call can be registered. Registration and teardown
//! take the same lock, so a call is either failed by teardown or never
//! registered at all.

use crate::core::codec::{ensure_object, OutboundFrame, ResultFrame};
use crate::error::{HubError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};

pub(crate) type FrameSender = mpsc::UnboundedSender<OutboundFrame>;

/// Receiving half of a registered call
pub type Completion = oneshot::Receiver<Result<ResultFrame>>;

#[derive(Default)]
struct Table {
    writer: Option<FrameSender>,
    calls: HashMap<u64, oneshot::Sender<Result<ResultFrame>>>,
}

pub struct PendingCalls {
    /// Last id handed out; ids start at 1 and are never reused
    last_id: AtomicU64,
    table: Mutex<Table>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            last_id: AtomicU64::new(0),
            table: Mutex::new(Table::default()),
        }
    }

    /// Allocate the next correlation id
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Most recently allocated id (0 before the first allocation)
    pub fn last_id(&self) -> u64 {
        self.last_id.load(Ordering::Acquire)
    }

    /// Accept calls, writing their frames to `writer`
    pub(crate) fn open(&self, writer: FrameSender) {
        self.table.lock().writer = Some(writer);
    }

    pub fn is_open(&self) -> bool {
        self.table.lock().writer.is_some()
    }

    /// Register a call and queue its frame on the current session
    ///
    /// Fails with `NotReady` when no session accepts calls, and with
    /// `InvalidPayload` when `payload` is not a JSON object (no id is consumed
    /// in either case).
    pub fn register(&self, payload: Value) -> Result<(u64, Completion)> {
        ensure_object(&payload)?;

        let mut table = self.table.lock();
        let writer = table.writer.clone().ok_or(HubError::NotReady)?;

        let id = self.next_id();
        let frame = OutboundFrame::request(id, payload)?;
        let (tx, rx) = oneshot::channel();
        table.calls.insert(id, tx);

        if writer.send(frame).is_err() {
            // Session loop already gone; teardown is about to run.
            table.calls.remove(&id);
            return Err(HubError::ConnectionLost("session closed while sending".into()));
        }

        Ok((id, rx))
    }

    /// Complete the call `frame.id` refers to
    ///
    /// Returns false when no call with that id is pending (late or foreign
    /// result).
    pub fn resolve(&self, frame: ResultFrame) -> bool {
        let slot = self.table.lock().calls.remove(&frame.id);
        match slot {
            Some(tx) => {
                // The caller may have stopped waiting; nothing to do then.
                let _ = tx.send(Ok(frame));
                true
            }
            None => false,
        }
    }

    /// Stop accepting calls and fail every pending one with `ConnectionLost`
    ///
    /// Returns the number of calls failed.
    pub fn fail_all(&self, reason: &str) -> usize {
        let calls = {
            let mut table = self.table.lock();
            table.writer = None;
            std::mem::take(&mut table.calls)
        };

        let count = calls.len();
        for (_, tx) in calls {
            let _ = tx.send(Err(HubError::ConnectionLost(reason.to_string())));
        }
        count
    }

    /// Number of calls waiting for a result
    pub fn len(&self) -> usize {
        self.table.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}
