//! Release signal between the driver and a service thread.
//!
//! A lock-free credit counter paired with a [`Parker`]: producers add credit
//! and unpark, the single consumer takes one credit per wake-up. The parker's
//! token makes an unpark that races ahead of `park` wake the consumer anyway,
//! so no release is ever lost.

use crossbeam::sync::{Parker, Unparker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// How releases that arrive while one is still pending are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMode {
    /// Every release is a credit; a slow task catches up by running once per
    /// credit. Misses stay visible, but a task that is persistently slower
    /// than its period grows an unbounded backlog.
    #[default]
    Accumulate,
    /// At most one credit is outstanding; extra releases are dropped and
    /// counted. Bounded backlog, but overruns silently skip work.
    Coalesce,
}

#[derive(Debug)]
struct Credits {
    mode: ReleaseMode,
    pending: AtomicU64,
    released: AtomicU64,
    coalesced: AtomicU64,
}

/// Producer half: cloned into the release driver.
#[derive(Debug, Clone)]
pub struct ReleaseSignal {
    credits: Arc<Credits>,
    unparker: Unparker,
}

/// Consumer half: owned by the service thread.
#[derive(Debug)]
pub struct ReleaseWaiter {
    credits: Arc<Credits>,
    parker: Parker,
}

/// Create a connected signal/waiter pair.
#[must_use]
pub fn release_channel(mode: ReleaseMode) -> (ReleaseSignal, ReleaseWaiter) {
    let parker = Parker::new();
    let credits = Arc::new(Credits {
        mode,
        pending: AtomicU64::new(0),
        released: AtomicU64::new(0),
        coalesced: AtomicU64::new(0),
    });
    let signal = ReleaseSignal {
        credits: Arc::clone(&credits),
        unparker: parker.unparker().clone(),
    };
    (signal, ReleaseWaiter { credits, parker })
}

impl ReleaseSignal {
    /// Signal the service once. Returns `false` if the release was coalesced.
    pub fn release(&self) -> bool {
        let credits = &self.credits;
        credits.released.fetch_add(1, Ordering::Relaxed);

        let added = match credits.mode {
            ReleaseMode::Accumulate => {
                credits.pending.fetch_add(1, Ordering::Release);
                true
            }
            ReleaseMode::Coalesce => {
                let added = credits
                    .pending
                    .compare_exchange(0, 1, Ordering::Release, Ordering::Relaxed)
                    .is_ok();
                if !added {
                    credits.coalesced.fetch_add(1, Ordering::Relaxed);
                }
                added
            }
        };

        self.unparker.unpark();
        added
    }

    /// Releases not yet consumed.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.credits.pending.load(Ordering::Acquire)
    }

    /// Total calls to [`release`](Self::release).
    #[must_use]
    pub fn released(&self) -> u64 {
        self.credits.released.load(Ordering::Relaxed)
    }

    /// Releases dropped because one was already pending.
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.credits.coalesced.load(Ordering::Relaxed)
    }

    /// Configured mode.
    #[must_use]
    pub fn mode(&self) -> ReleaseMode {
        self.credits.mode
    }
}

impl ReleaseWaiter {
    /// Take one credit without blocking.
    pub fn try_acquire(&self) -> bool {
        self.credits
            .pending
            .fetch_update(Ordering::Acquire, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Block until a credit is available, then take it.
    pub fn acquire(&self) {
        while !self.try_acquire() {
            self.parker.park();
        }
    }
}
