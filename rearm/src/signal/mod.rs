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

//! A resettable completion signal: a [`oneshot`](crate::oneshot) channel without a payload.
//!
//! The state machine, the reset semantics and the disposal contract are those of
//! [`oneshot`](crate::oneshot); only the value side carries nothing.
//!
//! # Examples
//!
//! ```
//! use std::thread;
//! use std::time::Duration;
//!
//! use rearm::signal;
//!
//! let (tx, rx) = signal::channel();
//!
//! let handle = thread::spawn(move || {
//!     thread::sleep(Duration::from_millis(10));
//!     tx.set_value();
//!     tx
//! });
//!
//! rx.get().unwrap();
//!
//! let tx = handle.join().unwrap();
//! tx.reset();
//! assert!(!rx.get_for(Duration::from_millis(10)));
//! ```

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use crate::oneshot;
use crate::oneshot::Failure;
use crate::oneshot::RecvError;


/// Creates a new resettable completion signal whose failures are [`Failure`]s.
pub fn channel() -> (Sender, Receiver) {
    channel_with()
}

/// Creates a new resettable completion signal with a custom failure type `E`.
pub fn channel_with<E>() -> (Sender<E>, Receiver<E>) {
    let (inner_tx, inner_rx) = oneshot::channel_with();
    (Sender { inner: inner_tx }, Receiver { inner: inner_rx })
}

/// Completes each generation of the associated [`Receiver`]s.
///
/// Dropping or overwriting the sender while a generation is pending resolves it with
/// [`RecvError::BrokenContract`].
pub struct Sender<E = Failure> {
    inner: oneshot::Sender<(), E>,
}

impl<E> fmt::Debug for Sender<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").field("inner", &self.inner).finish()
    }
}

impl<E> Default for Sender<E> {
    fn default() -> Self {
        Self {
            inner: oneshot::Sender::default(),
        }
    }
}

impl<E> Sender<E> {
    /// Signals completion of the current generation.
    ///
    /// Returns `false` if the generation was already resolved or the sender is empty.
    pub fn set_value(&self) -> bool {
        self.inner.set_value(())
    }

    /// Resolves the current generation with the application failure `failure`.
    pub fn set_failure(&self, failure: E) -> bool {
        self.inner.set_failure(failure)
    }

    /// Discards the current generation and starts a fresh, pending one.
    pub fn reset(&self) -> bool {
        self.inner.reset()
    }

    /// Returns a [`Promise`] bound to the current generation.
    pub fn promise(&self) -> Option<Promise<E>> {
        self.inner.promise().map(|inner| Promise { inner })
    }

    /// Detaches from the channel, resolving a pending generation with a broken contract.
    pub fn close(&mut self) -> bool {
        self.inner.close()
    }

    /// Returns `true` if this sender is not attached to a channel.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A write handle pinned to one generation, created by [`Sender::promise`].
pub struct Promise<E = Failure> {
    inner: oneshot::Promise<(), E>,
}

impl<E> fmt::Debug for Promise<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("inner", &self.inner).finish()
    }
}

impl<E> Promise<E> {
    /// Signals completion of the pinned generation.
    pub fn set_value(&self) -> bool {
        self.inner.set_value(())
    }

    /// Resolves the pinned generation with the application failure `failure`.
    pub fn set_failure(&self, failure: E) -> bool {
        self.inner.set_failure(failure)
    }

    /// Returns `true` if the pinned generation has been resolved.
    pub fn is_consumed(&self) -> bool {
        self.inner.is_consumed()
    }
}

/// Waits for each generation of the associated [`Sender`] to complete.
pub struct Receiver<E = Failure> {
    inner: oneshot::Receiver<(), E>,
}

impl<E> fmt::Debug for Receiver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").field("inner", &self.inner).finish()
    }
}

impl<E> Default for Receiver<E> {
    fn default() -> Self {
        Self {
            inner: oneshot::Receiver::default(),
        }
    }
}

impl<E> Clone for Receiver<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Receiver<E> {
    /// Returns `true` if the current generation has been resolved. Never blocks.
    pub fn ready(&self) -> bool {
        self.inner.ready()
    }

    /// Discards the current generation and starts a fresh, pending one.
    pub fn reset(&self) -> bool {
        self.inner.reset()
    }

    /// Returns `true` if this receiver is not attached to a channel.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<E: Clone> Receiver<E> {
    /// Blocks until the current generation is resolved.
    pub fn get(&self) -> Result<(), RecvError<E>> {
        self.inner.get()
    }

    /// Returns the result of the current generation if it has been resolved. Never blocks.
    pub fn try_get(&self) -> Option<Result<(), RecvError<E>>> {
        self.inner.try_get()
    }

    /// Blocks for at most `timeout`; returns `true` only if the generation completed.
    ///
    /// A failure within the bound reports `false`, like a timeout.
    pub fn get_for(&self, timeout: Duration) -> bool {
        self.inner.get_for(timeout).is_some()
    }

    /// Blocks until `deadline`; returns `true` only if the generation completed.
    pub fn get_until(&self, deadline: Instant) -> bool {
        self.inner.get_until(deadline).is_some()
    }
}
