// Copyright 2024 tison <wander4096@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A resettable one-shot channel is used for handing a single value (or failure) from one
//! producer thread to any number of consumer threads, and then rearming the same channel for
//! the next handoff. The [`channel`] function is used to create a [`Sender`] and [`Receiver`]
//! handle pair that form the channel.
//!
//! Each fulfillment cycle is called a *generation*. A generation is resolved exactly once, by
//! [`Sender::set_value`], [`Sender::set_failure`], or by the sender going away. Calling
//! [`reset`](Sender::reset) on either handle starts a new generation.
//!
//! Receivers wait on the generation that was current when they started waiting. A concurrent
//! reset installs a new generation for later calls, but never changes what an in-flight call
//! observes.
//!
//! # Examples
//!
//! ```
//! use std::thread;
//!
//! use rearm::oneshot;
//!
//! let (tx, rx) = oneshot::channel();
//!
//! let handle = thread::spawn(move || {
//!     tx.set_value(3);
//!     tx
//! });
//!
//! assert_eq!(rx.get().unwrap(), 3);
//!
//! // rearm and hand off again
//! let tx = handle.join().unwrap();
//! assert!(tx.reset());
//! tx.set_value(4);
//! assert_eq!(rx.get().unwrap(), 4);
//! ```
//!
//! If the sender is dropped without delivering anything, the receiver fails with
//! [`RecvError::BrokenContract`]:
//!
//! ```
//! use rearm::oneshot;
//! use rearm::oneshot::RecvError;
//!
//! let (tx, rx) = oneshot::channel::<u32>();
//! drop(tx);
//!
//! assert!(matches!(rx.get(), Err(RecvError::BrokenContract)));
//! ```

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

use crate::internal::Generation;
use crate::internal::Outcome;
use crate::internal::Writer;

mod error;

pub use self::error::Failure;
pub use self::error::RecvError;


/// Creates a new resettable one-shot channel whose failures are [`Failure`]s, and returns the
/// two endpoints, [`Sender`] and [`Receiver`].
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    channel_with()
}

/// Creates a new resettable one-shot channel with a custom failure type `E`.
///
/// # Examples
///
/// ```
/// use rearm::oneshot;
/// use rearm::oneshot::RecvError;
///
/// let (tx, rx) = oneshot::channel_with::<u32, &'static str>();
/// assert!(tx.set_failure("disk on fire"));
/// assert_eq!(rx.get(), Err(RecvError::Failed("disk on fire")));
/// ```
pub fn channel_with<T, E>() -> (Sender<T, E>, Receiver<T, E>) {
    let shared = Arc::new(Shared::new());
    (
        Sender {
            shared: Some(shared.clone()),
        },
        Receiver {
            shared: Some(shared),
        },
    )
}

/// The cell both handles point to.
///
/// The lock guards the write transition of the current generation and its replacement. It is
/// never held while waiting.
struct Shared<T, E> {
    state: Mutex<CellState<T, E>>,
}

struct CellState<T, E> {
    current: Arc<Writer<T, E>>,
    sender_alive: bool,
}

impl<T, E> Shared<T, E> {
    fn new() -> Self {
        Self {
            state: Mutex::new(CellState {
                current: Arc::new(Writer::new()),
                sender_alive: true,
            }),
        }
    }

    /// Clones the readable view of the current generation.
    fn snapshot(&self) -> Arc<Generation<T, E>> {
        self.state.lock().current.generation().clone()
    }

    /// Resolves the current generation under the cell lock. A rejected outcome is dropped after
    /// the lock is released.
    fn complete(&self, outcome: Outcome<T, E>) -> bool {
        let state = self.state.lock();
        let result = state.current.generation().complete(outcome);
        drop(state);

        match result {
            Ok(()) => true,
            Err(rejected) => {
                tracing::trace!("generation already consumed; write rejected");
                // the rejected payload may touch this channel when dropped
                drop(rejected);
                false
            }
        }
    }

    /// Replaces the current generation with a fresh one.
    fn rearm(&self) {
        let fresh = Arc::new(Writer::new());

        let mut state = self.state.lock();
        if !state.sender_alive {
            // no sender can ever resolve the fresh generation
            fresh.generation().break_contract();
        }
        let discarded = mem::replace(&mut state.current, fresh);
        drop(state);

        tracing::trace!(
            consumed = discarded.generation().is_consumed(),
            "channel rearmed"
        );
        // if no promise shares the discarded writer, this resolves its waiters
        drop(discarded);
    }

    /// Runs the disposal contract of the sender.
    fn disconnect_sender(&self) {
        let mut state = self.state.lock();
        state.sender_alive = false;
        if state.current.generation().break_contract() {
            tracing::debug!("sender dropped before completing its generation");
        }
    }
}

/// Delivers the result of each generation to the associated [`Receiver`]s.
///
/// A sender is the only producer of its channel. Dropping it, or overwriting it by assignment,
/// while the current generation is still pending resolves that generation with
/// [`RecvError::BrokenContract`].
///
/// A default-constructed sender is empty: every operation on it returns `false`.
pub struct Sender<T, E = Failure> {
    shared: Option<Arc<Shared<T, E>>>,
}

impl<T, E> fmt::Debug for Sender<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

impl<T, E> Default for Sender<T, E> {
    fn default() -> Self {
        Self { shared: None }
    }
}

impl<T, E> Sender<T, E> {
    /// Resolves the current generation with `value`.
    ///
    /// Returns `false` if the generation was already resolved or the sender is empty. Among
    /// concurrent writers of one generation exactly one returns `true`.
    pub fn set_value(&self, value: T) -> bool {
        self.complete(Outcome::Value(value))
    }

    /// Resolves the current generation with the application failure `failure`.
    ///
    /// Returns `false` if the generation was already resolved or the sender is empty.
    pub fn set_failure(&self, failure: E) -> bool {
        self.complete(Outcome::Failed(failure))
    }

    fn complete(&self, outcome: Outcome<T, E>) -> bool {
        match &self.shared {
            Some(shared) => shared.complete(outcome),
            None => false,
        }
    }

    /// Discards the current generation and starts a fresh, pending one.
    ///
    /// Receivers already waiting keep waiting on the discarded generation. Returns `false` only
    /// if the sender is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rearm::oneshot;
    ///
    /// let (tx, rx) = oneshot::channel();
    /// tx.set_value(1);
    /// assert!(rx.ready());
    ///
    /// assert!(tx.reset());
    /// assert!(!rx.ready());
    /// ```
    pub fn reset(&self) -> bool {
        match &self.shared {
            Some(shared) => {
                shared.rearm();
                true
            }
            None => false,
        }
    }

    /// Returns a [`Promise`] bound to the current generation.
    ///
    /// The promise can resolve that generation even after the channel has been reset, which is
    /// how a producer finishes work it started before a reset. Returns `None` if the sender is
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rearm::oneshot;
    ///
    /// let (tx, rx) = oneshot::channel();
    /// let first = tx.promise().unwrap();
    ///
    /// tx.reset();
    /// tx.set_value(2);
    ///
    /// assert!(first.set_value(1));
    /// assert_eq!(rx.get().unwrap(), 2);
    /// ```
    pub fn promise(&self) -> Option<Promise<T, E>> {
        let shared = self.shared.as_ref()?;
        let writer = shared.state.lock().current.clone();
        Some(Promise { writer })
    }

    /// Drops the channel reference now, resolving a pending generation with
    /// [`RecvError::BrokenContract`].
    ///
    /// The sender is empty afterwards. Returns `false` if it already was.
    pub fn close(&mut self) -> bool {
        match self.shared.take() {
            Some(shared) => {
                shared.disconnect_sender();
                true
            }
            None => false,
        }
    }

    /// Returns `true` if this sender is not attached to a channel.
    pub fn is_empty(&self) -> bool {
        self.shared.is_none()
    }
}

impl<T, E> Drop for Sender<T, E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// A write handle pinned to one generation, created by [`Sender::promise`].
///
/// When the last writer of a generation that is no longer current goes away unresolved, the
/// generation is resolved with [`RecvError::BrokenContract`].
pub struct Promise<T, E = Failure> {
    writer: Arc<Writer<T, E>>,
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("consumed", &self.writer.generation().is_consumed())
            .finish()
    }
}

impl<T, E> Promise<T, E> {
    /// Resolves the pinned generation with `value`.
    ///
    /// Returns `false` if the generation was already resolved.
    pub fn set_value(&self, value: T) -> bool {
        self.writer.generation().complete(Outcome::Value(value)).is_ok()
    }

    /// Resolves the pinned generation with the application failure `failure`.
    ///
    /// Returns `false` if the generation was already resolved.
    pub fn set_failure(&self, failure: E) -> bool {
        self.writer.generation().complete(Outcome::Failed(failure)).is_ok()
    }

    /// Returns `true` if the pinned generation has been resolved.
    pub fn is_consumed(&self) -> bool {
        self.writer.generation().is_consumed()
    }
}

/// Observes the result of each generation delivered by the associated [`Sender`].
///
/// Receivers can be cloned; every clone observes the same channel.
///
/// A default-constructed receiver is empty: waiting on it fails with [`RecvError::NoState`],
/// the other operations return `false` or `None`.
pub struct Receiver<T, E = Failure> {
    shared: Option<Arc<Shared<T, E>>>,
}

impl<T, E> fmt::Debug for Receiver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

impl<T, E> Default for Receiver<T, E> {
    fn default() -> Self {
        Self { shared: None }
    }
}

impl<T, E> Clone for Receiver<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Receiver<T, E> {
    pub(crate) fn snapshot(&self) -> Option<Arc<Generation<T, E>>> {
        self.shared.as_ref().map(|shared| shared.snapshot())
    }

    /// Returns `true` if the current generation has been resolved. Never blocks.
    pub fn ready(&self) -> bool {
        self.snapshot()
            .is_some_and(|generation| generation.is_consumed())
    }

    /// Discards the current generation and starts a fresh, pending one.
    ///
    /// This is the same operation as [`Sender::reset`]. Returns `false` only if the receiver is
    /// empty.
    pub fn reset(&self) -> bool {
        match &self.shared {
            Some(shared) => {
                shared.rearm();
                true
            }
            None => false,
        }
    }

    /// Returns `true` if this receiver is not attached to a channel.
    pub fn is_empty(&self) -> bool {
        self.shared.is_none()
    }
}

impl<T: Clone, E: Clone> Receiver<T, E> {
    /// Blocks until the current generation is resolved and returns its result.
    ///
    /// The generation is captured on entry: a concurrent [`reset`](Self::reset) does not
    /// switch this call over to the new generation.
    pub fn get(&self) -> Result<T, RecvError<E>> {
        match self.snapshot() {
            Some(generation) => generation.wait(into_result),
            None => Err(RecvError::NoState),
        }
    }

    /// Returns the result of the current generation if it has been resolved. Never blocks.
    pub fn try_get(&self) -> Option<Result<T, RecvError<E>>> {
        self.snapshot()?.try_read(into_result)
    }

    /// Blocks for at most `timeout` waiting for a value on the current generation.
    ///
    /// Returns `None` on timeout. A failure, including a broken contract, is reported as `None`
    /// as well; use [`get`](Self::get) to tell them apart.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use rearm::oneshot;
    ///
    /// let (tx, rx) = oneshot::channel();
    /// assert_eq!(rx.get_for(Duration::from_millis(20)), None);
    ///
    /// tx.set_value(9);
    /// assert_eq!(rx.get_for(Duration::from_millis(100)), Some(9));
    /// ```
    pub fn get_for(&self, timeout: Duration) -> Option<T> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.get_until(deadline),
            None => self.get().ok(),
        }
    }

    /// Blocks until `deadline` waiting for a value on the current generation.
    ///
    /// Same reporting as [`get_for`](Self::get_for).
    pub fn get_until(&self, deadline: Instant) -> Option<T> {
        self.snapshot()?
            .wait_until(deadline, |outcome| outcome.value().cloned())
            .flatten()
    }
}

fn into_result<T: Clone, E: Clone>(outcome: &Outcome<T, E>) -> Result<T, RecvError<E>> {
    match outcome {
        Outcome::Value(value) => Ok(value.clone()),
        Outcome::Failed(failure) => Err(RecvError::Failed(failure.clone())),
        Outcome::BrokenContract => Err(RecvError::BrokenContract),
    }
}
