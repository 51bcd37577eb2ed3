//! Exclusive runner for reentrant async activation and reveal.
//!
//! # Responsibility
//! - Allow at most one activation/reveal operation in flight.
//! - Coalesce requests arriving while one is outstanding onto its result.
//!
//! # Invariants
//! - The slot empties as soon as the in-flight operation settles.
//! - The slot also empties once every handle on the operation is dropped.
//! - A request made after settlement starts a new operation.
//! - Requests never start work while the slot is occupied.

use futures::future::{FutureExt, LocalBoxFuture, Shared, WeakShared};
use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

/// Shared handle on the in-flight operation.
pub type GateFuture<T> = Shared<LocalBoxFuture<'static, T>>;

type Slot<T> = RefCell<Option<WeakShared<LocalBoxFuture<'static, T>>>>;

/// Single-slot in-flight task cell.
///
/// Activating a tab makes the host report a focus change, which reveals the
/// tab, which can select it again. Routing both paths through one gate
/// breaks that loop.
pub struct ExclusiveGate<T: Clone + 'static> {
    in_flight: Rc<Slot<T>>,
}

impl<T: Clone + 'static> Default for ExclusiveGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ExclusiveGate<T> {
    pub fn new() -> Self {
        Self {
            in_flight: Rc::new(RefCell::new(None)),
        }
    }

    /// Returns whether an operation is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.running().is_some()
    }

    /// Starts `start()` unless an operation is already in flight, in which
    /// case `start` is not called and the in-flight operation is returned.
    ///
    /// The work runs when the returned future (or any clone) is polled.
    /// Dropping every handle abandons it and frees the slot.
    #[must_use = "the operation only runs when the returned future is polled"]
    pub fn run<F, Fut>(&self, start: F) -> GateFuture<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + 'static,
    {
        if let Some(running) = self.running() {
            return running;
        }

        let slot: Weak<Slot<T>> = Rc::downgrade(&self.in_flight);
        let operation = start();
        let task = async move {
            let output = operation.await;
            if let Some(slot) = slot.upgrade() {
                slot.borrow_mut().take();
            }
            output
        }
        .boxed_local()
        .shared();

        *self.in_flight.borrow_mut() = task.downgrade();
        task
    }

    fn running(&self) -> Option<GateFuture<T>> {
        let running = self.in_flight.borrow().as_ref().and_then(WeakShared::upgrade);
        if running.is_none() {
            self.in_flight.borrow_mut().take();
        }
        running
    }
}

#[cfg(test)]
mod tests {
    use super::ExclusiveGate;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn second_request_joins_in_flight_operation() {
        let gate = ExclusiveGate::<u32>::new();
        let started = Rc::new(Cell::new(0));
        let (sender, receiver) = oneshot::channel::<u32>();

        let first = {
            let started = Rc::clone(&started);
            gate.run(move || {
                started.set(started.get() + 1);
                async move { receiver.await.unwrap_or(0) }
            })
        };
        let second = {
            let started = Rc::clone(&started);
            gate.run(move || {
                started.set(started.get() + 1);
                async { 99 }
            })
        };

        assert!(gate.is_busy());
        assert_eq!(started.get(), 1);
        sender.send(7).unwrap();
        assert_eq!(block_on(second), 7);
        assert_eq!(block_on(first), 7);
        assert!(!gate.is_busy());
    }

    #[test]
    fn gate_resets_after_settlement() {
        let gate = ExclusiveGate::<Result<u32, String>>::new();
        let failed = block_on(gate.run(|| async { Err::<u32, _>("boom".to_string()) }));
        assert!(failed.is_err());
        assert!(!gate.is_busy());

        let next = block_on(gate.run(|| async { Ok(3) }));
        assert_eq!(next, Ok(3));
    }

    #[test]
    fn dropping_every_handle_frees_the_slot() {
        let gate = ExclusiveGate::<u32>::new();
        let abandoned = gate.run(|| async { 1 });
        let joined = gate.run(|| async { 2 });
        assert!(gate.is_busy());

        drop(abandoned);
        assert!(gate.is_busy());
        drop(joined);
        assert!(!gate.is_busy());

        assert_eq!(block_on(gate.run(|| async { 3 })), 3);
    }
}
