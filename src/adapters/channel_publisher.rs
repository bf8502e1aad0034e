//! In-process publisher over a crossbeam channel
//!
//! Useful when the consumer lives in the same process (embedding, tests).
//! Snapshots are cloned into the channel; the worker never shares state
//! with the receiver. A [`ChannelPublisher::pair`] holds at most one
//! snapshot: a slow consumer misses intermediate states and always reads
//! the newest one.

use std::ops::Deref;
use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::domain::{LiveSnapshot, ScanError, ScanResult, SweepSnapshot};
use crate::ports::Publisher;

/// One published snapshot of either role
#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Sweep(SweepSnapshot),
    Live(LiveSnapshot),
}

impl Published {
    pub fn version(&self) -> u64 {
        match self {
            Published::Sweep(s) => s.version,
            Published::Live(l) => l.version,
        }
    }
}

enum Delivery {
    /// Blocking send of every snapshot into the caller's channel
    Every,
    /// Replace whatever the consumer has not read yet
    Latest {
        stale: Receiver<Published>,
        consumer: Weak<()>,
    },
}

/// Consumer end of [`ChannelPublisher::pair`]
pub struct SnapshotReceiver {
    rx: Receiver<Published>,
    _alive: Arc<()>,
}

impl Deref for SnapshotReceiver {
    type Target = Receiver<Published>;

    fn deref(&self) -> &Self::Target {
        &self.rx
    }
}

pub struct ChannelPublisher {
    tx: Sender<Published>,
    delivery: Delivery,
}

impl ChannelPublisher {
    /// Deliver every snapshot into `tx`. A bounded sender applies
    /// backpressure to the worker.
    pub fn new(tx: Sender<Published>) -> Self {
        Self {
            tx,
            delivery: Delivery::Every,
        }
    }

    /// Publisher plus a receiver that only ever holds the newest snapshot
    pub fn pair() -> (Self, SnapshotReceiver) {
        let (tx, rx) = bounded(1);
        let alive = Arc::new(());
        let publisher = Self {
            tx,
            delivery: Delivery::Latest {
                stale: rx.clone(),
                consumer: Arc::downgrade(&alive),
            },
        };
        (publisher, SnapshotReceiver { rx, _alive: alive })
    }

    fn send(&self, item: Published) -> ScanResult<()> {
        match &self.delivery {
            Delivery::Every => self.tx.send(item).map_err(|_| disconnected()),
            Delivery::Latest { stale, consumer } => {
                if consumer.strong_count() == 0 {
                    return Err(disconnected());
                }
                let mut item = item;
                loop {
                    match self.tx.try_send(item) {
                        Ok(()) => return Ok(()),
                        Err(TrySendError::Full(back)) => {
                            // Drop the unread snapshot and retry with the new one
                            let _ = stale.try_recv();
                            item = back;
                        }
                        Err(TrySendError::Disconnected(_)) => return Err(disconnected()),
                    }
                }
            }
        }
    }
}

fn disconnected() -> ScanError {
    ScanError::Publish("snapshot receiver disconnected".into())
}

impl Publisher for ChannelPublisher {
    fn publish_sweep(&mut self, snapshot: &SweepSnapshot) -> ScanResult<()> {
        self.send(Published::Sweep(snapshot.clone()))
    }

    fn publish_live(&mut self, snapshot: &LiveSnapshot) -> ScanResult<()> {
        self.send(Published::Live(snapshot.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(version: u64) -> LiveSnapshot {
        LiveSnapshot {
            version,
            cycle: version,
            center_hz: 100e6,
            frequencies_hz: vec![100e6],
            psd_db: vec![-80.0],
            waterfall: Vec::new(),
            timestamp_ms: 0,
        }
    }

    #[test]
    fn every_snapshot_arrives_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut publisher = ChannelPublisher::new(tx);
        publisher.publish_live(&live(1)).unwrap();
        publisher.publish_live(&live(2)).unwrap();
        let versions: Vec<u64> = rx.try_iter().map(|p| p.version()).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn slow_consumer_only_sees_newest_snapshot() {
        let (mut publisher, rx) = ChannelPublisher::pair();
        for version in 1..=5000 {
            publisher.publish_live(&live(version)).unwrap();
        }
        assert!(rx.len() <= 1);
        assert_eq!(rx.try_recv().unwrap().version(), 5000);
        assert!(rx.try_recv().is_err());

        publisher.publish_live(&live(5001)).unwrap();
        assert_eq!(rx.try_recv().unwrap().version(), 5001);
    }

    #[test]
    fn dropped_receiver_is_a_publish_error() {
        let (mut publisher, rx) = ChannelPublisher::pair();
        drop(rx);
        assert!(matches!(
            publisher.publish_live(&live(1)),
            Err(ScanError::Publish(_))
        ));

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut publisher = ChannelPublisher::new(tx);
        drop(rx);
        assert!(matches!(
            publisher.publish_live(&live(1)),
            Err(ScanError::Publish(_))
        ));
    }
}
