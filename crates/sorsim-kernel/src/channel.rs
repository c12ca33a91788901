//! Bounded keyed channel with priority-selective receive.
//!
//! Every record carries an integer key; a receiver asks for the record with
//! the **lowest key ≤ K** and gets FIFO order within equal keys. This is the
//! one channel primitive every actor pair in the pipeline shares: VIP
//! preemption, triage-color ordering and the plain log stream are all just
//! different key layouts on top of it.
//!
//! Senders never block. `try_send` reports a full or closed channel
//! immediately; [`KeyedChannel::send_backoff`] encodes the sender discipline
//! used across the simulation — retry a full channel every millisecond,
//! treat a closed channel as permanent failure.
//!
//! Internally: a `BTreeMap<key, VecDeque>` under a mutex plus a
//! `tokio::sync::Notify`. The map keeps keys sorted so the lowest eligible
//! key is the first entry; the notify wakes every blocked receiver on each
//! send, and receivers re-check the predicate themselves (receivers on one
//! channel are few, so the herd is tiny).

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;

/// Default per-channel capacity in records, the in-process stand-in for the
/// 256 KB queue tuning of the process-based ancestor.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Backoff applied between retries when a send hits a full channel.
pub const SEND_RETRY_BACKOFF: Duration = Duration::from_millis(1);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// Channel is at capacity; the record is handed back for retry.
    #[error("channel full")]
    Full(T),

    /// Channel was closed; no further sends can ever succeed.
    #[error("channel closed")]
    Closed(T),
}

/// Permanent send failure: the channel is closed. Carries the record back so
/// the sender can release any capacity held on its behalf.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("channel closed")]
pub struct SendError<T>(pub T);

#[derive(Error, Debug, PartialEq, Eq)]
#[error("channel closed and drained")]
pub struct RecvError;

struct ChannelState<T> {
    queues: BTreeMap<u32, VecDeque<T>>,
    len: usize,
    closed: bool,
}

impl<T> ChannelState<T> {
    /// Pop the front record of the lowest non-empty key ≤ `max_key`.
    fn pop_at_most(&mut self, max_key: u32) -> Option<(u32, T)> {
        let key = self
            .queues
            .range(..=max_key)
            .find(|(_, queue)| !queue.is_empty())
            .map(|(&key, _)| key)?;
        let queue = self.queues.get_mut(&key)?;
        let value = queue.pop_front()?;
        if queue.is_empty() {
            self.queues.remove(&key);
        }
        self.len -= 1;
        Some((key, value))
    }
}

struct Shared<T> {
    state: Mutex<ChannelState<T>>,
    notify: Notify,
    capacity: usize,
}

/// Cloneable handle to one bounded keyed channel. All clones refer to the
/// same queue; any clone may send, receive or close.
pub struct KeyedChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for KeyedChannel<T> {
    fn clone(&self) -> Self {
        KeyedChannel {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> KeyedChannel<T> {
    pub fn bounded(capacity: usize) -> KeyedChannel<T> {
        KeyedChannel {
            shared: Arc::new(Shared {
                state: Mutex::new(ChannelState {
                    queues: BTreeMap::new(),
                    len: 0,
                    closed: false,
                }),
                notify: Notify::new(),
                capacity,
            }),
        }
    }

    /// Non-blocking send. A full channel hands the record back for retry; a
    /// closed channel is permanent.
    pub fn try_send(&self, key: u32, value: T) -> std::result::Result<(), TrySendError<T>> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.closed {
                return Err(TrySendError::Closed(value));
            }
            if state.len >= self.shared.capacity {
                return Err(TrySendError::Full(value));
            }
            state.queues.entry(key).or_default().push_back(value);
            state.len += 1;
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    /// The sender discipline: retry a saturated channel every millisecond,
    /// indefinitely; surface only a closed channel as an error.
    pub async fn send_backoff(&self, key: u32, value: T) -> std::result::Result<(), SendError<T>> {
        let mut value = value;
        loop {
            match self.try_send(key, value) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(returned)) => {
                    value = returned;
                    tokio::time::sleep(SEND_RETRY_BACKOFF).await;
                }
                Err(TrySendError::Closed(returned)) => return Err(SendError(returned)),
            }
        }
    }

    /// Receive the lowest-keyed record whose key ≤ `max_key`, FIFO within a
    /// key. Blocks until a matching record arrives. Once the channel is
    /// closed, remaining matching records are still drained; afterwards
    /// `RecvError` marks the end.
    ///
    /// Cancel-safe: a record is only popped in the same poll that returns it.
    pub async fn recv_at_most(&self, max_key: u32) -> std::result::Result<(u32, T), RecvError> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.state.lock().unwrap();
                if let Some(entry) = state.pop_at_most(max_key) {
                    return Ok(entry);
                }
                if state.closed {
                    return Err(RecvError);
                }
            }

            notified.await;
        }
    }

    /// Non-blocking variant of [`recv_at_most`](KeyedChannel::recv_at_most).
    pub fn try_recv_at_most(&self, max_key: u32) -> Option<(u32, T)> {
        self.shared.state.lock().unwrap().pop_at_most(max_key)
    }

    /// Records currently queued, all keys combined.
    pub fn depth(&self) -> usize {
        self.shared.state.lock().unwrap().len
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().unwrap().closed
    }

    /// Close the channel. Senders fail permanently from here on; receivers
    /// drain what is left and then observe the end.
    pub fn close(&self) {
        self.shared.state.lock().unwrap().closed = true;
        self.shared.notify.notify_waiters();
    }
}
