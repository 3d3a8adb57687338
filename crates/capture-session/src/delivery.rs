//! Latest-wins delivery channel
//!
//! Single-producer, single-consumer channel from the pump to the
//! presentation layer. The monitor list is queued once and never dropped;
//! at most one frame is pending at a time, and a newer frame replaces an
//! undelivered one so the consumer always sees the most recent state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use frame_source::{Frame, MonitorInfo};

/// Message delivered to the presentation layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Monitor enumeration, sent exactly once before any frame
    MonitorList(Vec<MonitorInfo>),
    /// One captured frame
    Frame(Frame),
}

#[derive(Default)]
struct Slots {
    monitors: Option<Vec<MonitorInfo>>,
    frame: Option<Frame>,
    sender_gone: bool,
}

struct Shared {
    slots: Mutex<Slots>,
    notify: Notify,
    dropped: AtomicU64,
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (DeliverySender, DeliveryReceiver) {
    let shared = Arc::new(Shared {
        slots: Mutex::new(Slots::default()),
        notify: Notify::new(),
        dropped: AtomicU64::new(0),
    });
    (
        DeliverySender {
            shared: shared.clone(),
        },
        DeliveryReceiver { shared },
    )
}

/// Producer half, held by the capture session
pub struct DeliverySender {
    shared: Arc<Shared>,
}

impl DeliverySender {
    /// Queue the monitor list. Never dropped; delivered before any frame.
    pub fn send_monitors(&self, monitors: Vec<MonitorInfo>) {
        self.shared.slots.lock().monitors = Some(monitors);
        self.shared.notify.notify_one();
    }

    /// Queue a frame, replacing any undelivered one.
    pub fn send_frame(&self, frame: Frame) {
        {
            let mut slots = self.shared.slots.lock();
            if slots.frame.replace(frame).is_some() {
                let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(dropped, "replaced undelivered frame");
            }
        }
        self.shared.notify.notify_one();
    }

    /// Frames discarded because the consumer had not drained the previous one
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for DeliverySender {
    fn drop(&mut self) {
        self.shared.slots.lock().sender_gone = true;
        self.shared.notify.notify_one();
    }
}

/// Consumer half, held by the presentation layer
pub struct DeliveryReceiver {
    shared: Arc<Shared>,
}

impl DeliveryReceiver {
    /// Receive the next event, waiting if none is pending.
    ///
    /// Returns `None` once the sender is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            // Register for wakeup before checking the slots so a send
            // between the check and the await is not missed.
            let notified = self.shared.notify.notified();
            {
                let mut slots = self.shared.slots.lock();
                if let Some(monitors) = slots.monitors.take() {
                    return Some(SessionEvent::MonitorList(monitors));
                }
                if let Some(frame) = slots.frame.take() {
                    return Some(SessionEvent::Frame(frame));
                }
                if slots.sender_gone {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Receive without waiting; `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        let mut slots = self.shared.slots.lock();
        if let Some(monitors) = slots.monitors.take() {
            return Some(SessionEvent::MonitorList(monitors));
        }
        slots.frame.take().map(SessionEvent::Frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use frame_source::PixelFormat;

    fn test_frame(width: u32, height: u32, sequence: u64) -> Frame {
        let data = Bytes::from(vec![0u8; (width * height * 4) as usize]);
        let mut frame = Frame::new(data, width, height, PixelFormat::Bgra8, 0).unwrap();
        frame.sequence = sequence;
        frame
    }

    #[tokio::test]
    async fn latest_frame_wins_under_backpressure() {
        let (tx, mut rx) = channel();

        tx.send_frame(test_frame(8, 8, 0));
        tx.send_frame(test_frame(8, 8, 1));
        tx.send_frame(test_frame(8, 8, 2));

        match rx.recv().await {
            Some(SessionEvent::Frame(frame)) => assert_eq!(frame.sequence, 2),
            other => panic!("expected latest frame, got {:?}", other),
        }
        assert_eq!(tx.dropped_frames(), 2);
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn monitor_list_is_delivered_before_frames() {
        let (tx, mut rx) = channel();

        tx.send_frame(test_frame(8, 8, 0));
        tx.send_monitors(vec![
            MonitorInfo::new(0, "display-0", 1920, 1080).unwrap(),
        ]);

        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::MonitorList(monitors)) if monitors.len() == 1
        ));
        assert!(matches!(rx.recv().await, Some(SessionEvent::Frame(_))));
    }

    #[tokio::test]
    async fn monitor_list_is_never_dropped() {
        let (tx, mut rx) = channel();

        tx.send_monitors(vec![
            MonitorInfo::new(0, "display-0", 1920, 1080).unwrap(),
        ]);
        for sequence in 0..16 {
            tx.send_frame(test_frame(8, 8, sequence));
        }

        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::MonitorList(_))
        ));
        match rx.recv().await {
            Some(SessionEvent::Frame(frame)) => assert_eq!(frame.sequence, 15),
            other => panic!("expected newest frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn recv_ends_after_sender_drops() {
        let (tx, mut rx) = channel();
        tx.send_frame(test_frame(8, 8, 7));
        drop(tx);

        assert!(matches!(rx.recv().await, Some(SessionEvent::Frame(_))));
        assert!(rx.recv().await.is_none());
    }
}
