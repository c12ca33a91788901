//! The waiting-room seat semaphore.
//!
//! Permits are free seats. A patient acquires `persons_count` seats in one
//! atomic step (a guardian-accompanied child never ends up holding one of
//! two seats while blocking on the second), and whichever actor decides the
//! patient leaves the waiting room posts them back. The semaphore is fair
//! FIFO, so admission order between blocked patients follows arrival order
//! at the semaphore.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{KernelError, Result};

#[derive(Debug)]
pub struct WaitingRoom {
    seats: Semaphore,
    capacity: u32,
}

impl WaitingRoom {
    pub fn new(capacity: u32) -> Arc<WaitingRoom> {
        Arc::new(WaitingRoom {
            seats: Semaphore::new(capacity as usize),
            capacity,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Free seats right now. Together with the shared-state occupancy this
    /// should always reconstruct the capacity: `available + inside = N`.
    pub fn available(&self) -> u32 {
        self.seats.available_permits() as u32
    }

    /// Reserve `persons` seats, blocking until all of them are free at once.
    /// The permits are forgotten: releasing is an explicit, separate act
    /// performed by the decider, possibly on another actor entirely.
    pub async fn acquire(&self, persons: u32) -> Result<()> {
        let permit = self
            .seats
            .acquire_many(persons)
            .await
            .map_err(|_| KernelError::WaitingRoomClosed)?;
        permit.forget();
        Ok(())
    }

    /// Post `persons` seats back.
    pub fn release(&self, persons: u32) {
        self.seats.add_permits(persons as usize);
    }
}
