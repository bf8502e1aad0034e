//! Publication port
//!
//! Workers hand complete snapshots to a publisher; consumers read them on
//! their own schedule. A publisher never exposes a partially written part,
//! but different parts of one snapshot may become visible at different
//! times.

use crate::domain::{LiveSnapshot, ScanResult, SweepSnapshot};

pub trait Publisher {
    fn publish_sweep(&mut self, snapshot: &SweepSnapshot) -> ScanResult<()>;

    fn publish_live(&mut self, snapshot: &LiveSnapshot) -> ScanResult<()>;
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish_sweep(&mut self, snapshot: &SweepSnapshot) -> ScanResult<()> {
        (**self).publish_sweep(snapshot)
    }

    fn publish_live(&mut self, snapshot: &LiveSnapshot) -> ScanResult<()> {
        (**self).publish_live(snapshot)
    }
}
