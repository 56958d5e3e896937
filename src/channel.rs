//! Channel - ordered multicast with terminal states
//!
//! Every notification in the compositor travels through a [`Channel`]:
//! region geometry changes, symbol redraw requests and platform input.
//!
//! # Lifecycle
//!
//! A channel starts open and may publish any number of values. It ends
//! either completed or errored; both are permanent, and publishing to a
//! terminal channel fails with [`Error::InvalidState`].
//!
//! # Re-entrancy
//!
//! All operations on one channel serialize through a re-entrant lock, so a
//! subscriber may unsubscribe, subscribe or even publish from inside its
//! own callback. Unsubscribing only marks the subscription dead; dead
//! entries are purged before the next multicast, so iteration never sees a
//! half-removed list.
//!
//! # Example
//!
//! ```
//! use tessera::channel::Channel;
//!
//! let channel = Channel::<u32>::new();
//! let sub = channel.subscribe_fn(|value| println!("got {value}"));
//! channel.publish(7).unwrap();
//! sub.unsubscribe();
//! ```

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::ReentrantMutex;

use crate::error::{Error, Fault, Result};

// =============================================================================
// OBSERVER
// =============================================================================

/// Receiver side of a channel.
///
/// A handler that returns `Err` escalates: during `on_next` the channel
/// turns errored and every live subscriber receives `on_error`; during
/// finalization the failure replaces the error handed to the subscribers
/// that follow.
pub trait Observer<T>: Send + Sync {
    fn on_next(&self, value: &T) -> std::result::Result<(), Fault>;

    fn on_error(&self, _error: &Fault) -> std::result::Result<(), Fault> {
        Ok(())
    }

    fn on_completed(&self) -> std::result::Result<(), Fault> {
        Ok(())
    }
}

/// Closure adapter used by [`Channel::subscribe_fn`].
struct FnObserver<F>(F);

impl<T, F> Observer<T> for FnObserver<F>
where
    F: Fn(&T) + Send + Sync,
{
    fn on_next(&self, value: &T) -> std::result::Result<(), Fault> {
        (self.0)(value);
        Ok(())
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle to one subscription.
///
/// Dropping the handle does NOT unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Debug, Clone)]
pub struct Subscription {
    alive: Arc<AtomicBool>,
}

impl Subscription {
    fn new(alive: Arc<AtomicBool>) -> Self {
        Self { alive }
    }

    /// A subscription that is already dead (terminal channel).
    fn inert() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }

    /// Stop receiving notifications. Idempotent.
    pub fn unsubscribe(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Whether the subscription still receives notifications.
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

type Teardown = Box<dyn FnOnce() -> Result<()> + Send>;

/// A bag of teardown actions disposed together.
///
/// Disposal runs every action even when some fail and reports all failures
/// at once.
#[derive(Default)]
pub struct SubscriptionSet {
    teardowns: Vec<Teardown>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.teardowns.push(Box::new(move || {
            subscription.unsubscribe();
            Ok(())
        }));
    }

    /// Register an arbitrary fallible teardown action.
    pub fn push_fn<F>(&mut self, teardown: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.teardowns.push(Box::new(teardown));
    }

    pub fn len(&self) -> usize {
        self.teardowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teardowns.is_empty()
    }

    /// Run every teardown, collecting failures.
    pub fn dispose(&mut self) -> Result<()> {
        let errors: Vec<Error> = self
            .teardowns
            .drain(..)
            .filter_map(|teardown| teardown().err())
            .collect();
        Error::collect(errors)
    }
}

// =============================================================================
// CHANNEL STATE
// =============================================================================

struct Entry<T> {
    observer: Box<dyn Observer<T>>,
    alive: Arc<AtomicBool>,
}

impl<T> Entry<T> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
enum Status {
    Open,
    Completed,
    Errored(Fault),
}

struct Inner<T> {
    entries: Vec<Arc<Entry<T>>>,
    status: Status,
}

impl<T> Inner<T> {
    fn purge(&mut self) {
        self.entries.retain(|entry| entry.is_alive());
    }

    fn is_open(&self) -> bool {
        matches!(self.status, Status::Open)
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Generic ordered multicast primitive.
///
/// Cloning a channel yields another handle to the same subscriber list.
pub struct Channel<T> {
    state: Arc<ReentrantMutex<RefCell<Inner<T>>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(ReentrantMutex::new(RefCell::new(Inner {
                entries: Vec::new(),
                status: Status::Open,
            }))),
        }
    }

    /// Append an observer to the subscriber list.
    ///
    /// Subscribing to a terminal channel replays the terminal notification
    /// to the new observer synchronously and returns an inactive handle.
    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        let guard = self.state.lock();
        let status = {
            let mut inner = guard.borrow_mut();
            if inner.is_open() {
                let alive = Arc::new(AtomicBool::new(true));
                inner.entries.push(Arc::new(Entry {
                    observer: Box::new(observer),
                    alive: Arc::clone(&alive),
                }));
                return Subscription::new(alive);
            }
            inner.status.clone()
        };

        let replay = match status {
            Status::Errored(fault) => observer.on_error(&fault),
            _ => observer.on_completed(),
        };
        if let Err(fault) = replay {
            log::debug!("Observer failed during terminal replay: {}", fault);
        }
        Subscription::inert()
    }

    /// Subscribe a closure that only cares about values.
    pub fn subscribe_fn<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: 'static,
    {
        self.subscribe(FnObserver(handler))
    }

    /// Deliver a value to every live subscriber in subscription order.
    pub fn publish(&self, value: T) -> Result<()> {
        self.publish_ref(&value)
    }

    /// Like [`Channel::publish`], leaving the value with the caller so it can
    /// be inspected after delivery.
    pub fn publish_ref(&self, value: &T) -> Result<()> {
        let guard = self.state.lock();
        let snapshot = {
            let mut inner = guard.borrow_mut();
            if !inner.is_open() {
                return Err(Error::InvalidState("publish on a terminal channel"));
            }
            inner.purge();
            inner.entries.clone()
        };

        for entry in &snapshot {
            // A subscriber may have finalized the channel re-entrantly.
            if !guard.borrow().is_open() {
                break;
            }
            if !entry.is_alive() {
                continue;
            }
            if let Err(fault) = entry.observer.on_next(value) {
                // Already terminal means a nested call finalized first.
                let _ = self.finalize(Status::Errored(Arc::clone(&fault)));
                return Err(Error::Observer(fault));
            }
        }
        Ok(())
    }

    /// Terminate successfully, notifying every live subscriber.
    pub fn complete(&self) -> Result<()> {
        self.finalize(Status::Completed)
    }

    /// Terminate with an error, notifying every live subscriber.
    pub fn error(&self, fault: Fault) -> Result<()> {
        self.finalize(Status::Errored(fault))
    }

    /// Complete the channel unless it is already terminal. Idempotent.
    pub fn dispose(&self) -> Result<()> {
        let guard = self.state.lock();
        if !guard.borrow().is_open() {
            return Ok(());
        }
        self.finalize(Status::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.state.lock().borrow().is_open()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state.lock().borrow().status, Status::Completed)
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.state.lock().borrow().status, Status::Errored(_))
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let guard = self.state.lock();
        let inner = guard.borrow();
        inner.entries.iter().filter(|entry| entry.is_alive()).count()
    }

    fn finalize(&self, status: Status) -> Result<()> {
        let guard = self.state.lock();
        let snapshot = {
            let mut inner = guard.borrow_mut();
            if !inner.is_open() {
                return Err(Error::InvalidState("channel is already terminal"));
            }
            inner.status = status.clone();
            inner.purge();
            std::mem::take(&mut inner.entries)
        };

        let mut current = match status {
            Status::Errored(fault) => Some(fault),
            _ => None,
        };
        let mut raised = None;

        for entry in snapshot {
            if !entry.is_alive() {
                continue;
            }
            entry.alive.store(false, Ordering::Release);
            let result = match &current {
                Some(fault) => entry.observer.on_error(fault),
                None => entry.observer.on_completed(),
            };
            if let Err(fault) = result {
                current = Some(Arc::clone(&fault));
                raised = Some(fault);
            }
        }

        match raised {
            Some(fault) => {
                guard.borrow_mut().status = Status::Errored(Arc::clone(&fault));
                Err(Error::Observer(fault))
            }
            None => Ok(()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
