//! Bounded, drop-oldest frame channel
//!
//! The perception loop publishes into the channel and never blocks; command
//! handlers take the freshest frame. When the channel is full the oldest unread
//! frame is evicted inside the same critical section that inserts the new one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use super::Frame;
use crate::{Error, Result};

/// Counters describing channel traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames handed to `publish`
    pub published: u64,
    /// Frames evicted or skipped without being consumed
    pub dropped: u64,
    /// Frames returned to a consumer
    pub taken: u64,
}

/// A capacity-N slot holding the most recent frames
pub struct FrameChannel {
    capacity: usize,
    slot: Mutex<VecDeque<Frame>>,
    notify: Notify,
    closed: AtomicBool,
    published: AtomicU64,
    dropped: AtomicU64,
    taken: AtomicU64,
}

impl FrameChannel {
    /// Create a channel holding at most `capacity` frames (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slot: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            taken: AtomicU64::new(0),
        }
    }

    /// Insert a frame, evicting the oldest unread frames if full
    ///
    /// Never blocks on consumers. Frames published after `close` are discarded.
    pub fn publish(&self, frame: Frame) {
        if self.is_closed() {
            return;
        }

        let sequence = frame.sequence();
        let evicted = {
            let mut slot = self.lock();
            let mut evicted = 0u64;
            while slot.len() >= self.capacity {
                slot.pop_front();
                evicted += 1;
            }
            slot.push_back(frame);
            evicted
        };

        self.published.fetch_add(1, Ordering::Relaxed);
        if evicted > 0 {
            self.dropped.fetch_add(evicted, Ordering::Relaxed);
        }
        tracing::trace!(sequence, evicted, "frame published");

        self.notify.notify_waiters();
    }

    /// Take the freshest frame without waiting
    ///
    /// Older buffered frames are discarded, so a consumer never observes a
    /// frame older than one it has already taken.
    pub fn try_take(&self) -> Option<Frame> {
        let (frame, skipped) = {
            let mut slot = self.lock();
            let frame = slot.pop_back();
            let skipped = slot.len() as u64;
            slot.clear();
            (frame, skipped)
        };

        if skipped > 0 {
            self.dropped.fetch_add(skipped, Ordering::Relaxed);
        }
        if frame.is_some() {
            self.taken.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    /// Wait up to `timeout` for a frame
    ///
    /// # Errors
    ///
    /// Returns `Error::NoFrame` on timeout, or `Error::DeviceUnavailable` once
    /// the channel has been closed and drained
    pub async fn take_timeout(&self, timeout: Duration) -> Result<Frame> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a publish between check and await is not missed
            notified.as_mut().enable();

            if let Some(frame) = self.try_take() {
                return Ok(frame);
            }
            if self.is_closed() {
                return Err(Error::DeviceUnavailable("frame channel closed".to_string()));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(Error::NoFrame);
            }
        }
    }

    /// Mark the producer as gone and wake every waiter
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("frame channel closed");
        }
        self.notify.notify_waiters();
    }

    /// Whether the producer has shut down
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of frames currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of traffic counters
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        // A panic while holding the lock cannot leave the deque inconsistent
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FrameChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameChannel")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn frame(seq: u64) -> Frame {
        Frame::blank(4, 4, seq)
    }

    #[test]
    fn test_empty_channel() {
        let channel = FrameChannel::new(1);
        assert!(channel.try_take().is_none());
        assert!(channel.is_empty());
    }

    #[test]
    fn test_capacity_one_keeps_latest() {
        let channel = FrameChannel::new(1);
        for seq in 1..=5 {
            channel.publish(frame(seq));
            assert_eq!(channel.len(), 1);
        }

        assert_eq!(channel.try_take().map(|f| f.sequence()), Some(5));
        assert!(channel.try_take().is_none());

        let stats = channel.stats();
        assert_eq!(stats.published, 5);
        assert_eq!(stats.dropped, 4);
        assert_eq!(stats.taken, 1);
    }

    #[test]
    fn test_never_returns_stale_frame() {
        for capacity in 1..=4 {
            let channel = FrameChannel::new(capacity);
            for seq in 1..=20u64 {
                channel.publish(frame(seq));
                assert!(channel.len() <= capacity);

                if seq % 3 == 0 {
                    let taken = channel.try_take().unwrap();
                    // Never older than the N most recently published
                    assert!(taken.sequence() + capacity as u64 > seq);
                }
            }
        }
    }

    #[test]
    fn test_take_discards_older_frames() {
        let channel = FrameChannel::new(3);
        channel.publish(frame(1));
        channel.publish(frame(2));
        channel.publish(frame(3));

        assert_eq!(channel.try_take().map(|f| f.sequence()), Some(3));
        // 1 and 2 are older than what the consumer already saw
        assert!(channel.try_take().is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let channel = FrameChannel::new(0);
        assert_eq!(channel.capacity(), 1);
    }

    #[tokio::test]
    async fn test_take_timeout_expires() {
        let channel = FrameChannel::new(1);
        let result = channel.take_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::NoFrame)));
    }

    #[tokio::test]
    async fn test_take_timeout_wakes_on_publish() {
        let channel = Arc::new(FrameChannel::new(1));
        let producer = Arc::clone(&channel);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.publish(frame(42));
        });

        let frame = channel.take_timeout(Duration::from_secs(2)).await.unwrap();
        assert_eq!(frame.sequence(), 42);
    }

    #[tokio::test]
    async fn test_closed_channel_reports_unavailable() {
        let channel = FrameChannel::new(1);
        channel.close();
        channel.publish(frame(1));

        let result = channel.take_timeout(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
    }
}
