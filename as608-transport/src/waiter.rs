//! Registry of callers waiting for the next exchange
//!
//! Every receive call registers a one-shot slot. The reader drains the whole
//! registry after each exchange and hands every slot a clone of the same
//! result: there is no request/response correlation on this protocol.
//!
//! A waiter that gives up while its exchange is being read leaves a reply
//! owed by the module. The registry counts those stale exchanges so the
//! reader can throw the late replies away instead of handing them to the
//! next caller.

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tracing::trace;

use as608_core::Packet;

use crate::error::Result;

/// Result handed to waiters: a logical packet or the error that ended it
pub type Delivery = Result<Packet>;

/// Identifier of a registered waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

/// One-shot delivery slot
#[derive(Debug)]
pub struct Waiter {
    id: WaiterId,
    slot: oneshot::Sender<Delivery>,
}

impl Waiter {
    /// Waiter identifier
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Deliver the result, consuming the slot
    ///
    /// Returns `false` if the caller stopped waiting.
    pub fn fulfil(self, delivery: Delivery) -> bool {
        let delivered = self.slot.send(delivery).is_ok();
        if !delivered {
            trace!(waiter = self.id.0, "Waiter went away before delivery");
        }
        delivered
    }
}

/// Ordered registry of waiters
#[derive(Debug, Default)]
pub struct WaiterRegistry {
    next_id: u64,
    waiters: VecDeque<Waiter>,
    in_flight: bool,
    stale: usize,
}

impl WaiterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new waiter at the back of the queue
    pub fn register(&mut self) -> (WaiterId, oneshot::Receiver<Delivery>) {
        let id = WaiterId(self.next_id);
        self.next_id += 1;

        let (slot, rx) = oneshot::channel();
        self.waiters.push_back(Waiter { id, slot });

        (id, rx)
    }

    /// Retire a waiter without delivering to it
    ///
    /// Returns `false` if it was already fulfilled or retired. Retiring the
    /// last waiter of an exchange that is being read marks that exchange
    /// stale.
    pub fn retire(&mut self, id: WaiterId) -> bool {
        let Some(pos) = self.waiters.iter().position(|w| w.id == id) else {
            return false;
        };

        self.waiters.remove(pos);
        if self.waiters.is_empty() && self.in_flight {
            self.stale += 1;
            trace!(stale = self.stale, "Exchange abandoned while in flight");
        }
        true
    }

    /// Start reading an exchange if anyone is waiting for one
    pub fn begin_exchange(&mut self) -> bool {
        self.in_flight = !self.waiters.is_empty() || self.stale > 0;
        self.in_flight
    }

    /// Finish the exchange started by `begin_exchange`
    ///
    /// Returns the waiters to deliver to, or `None` when the exchange was
    /// stale and its result must be dropped. Waiters registered for a later
    /// exchange stay registered in that case.
    pub fn finish_exchange(&mut self) -> Option<Vec<Waiter>> {
        self.in_flight = false;

        if self.stale > 0 {
            self.stale -= 1;
            return None;
        }
        Some(self.drain())
    }

    /// Check if an exchange is being read
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Number of late replies still to be discarded
    pub fn stale(&self) -> usize {
        self.stale
    }

    /// Take every registered waiter, oldest first
    pub fn drain(&mut self) -> Vec<Waiter> {
        self.waiters.drain(..).collect()
    }

    /// Number of registered waiters
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Check if nobody is waiting
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
