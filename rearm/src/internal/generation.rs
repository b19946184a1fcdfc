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

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;

/// How a generation was resolved.
#[derive(Debug)]
pub(crate) enum Outcome<T, E> {
    /// The producer delivered a value.
    Value(T),
    /// The producer delivered an application failure.
    Failed(E),
    /// Nobody can deliver anything to this generation any more.
    BrokenContract,
}

impl<T, E> Outcome<T, E> {
    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            Outcome::Value(value) => Some(value),
            Outcome::Failed(_) | Outcome::BrokenContract => None,
        }
    }
}

/// The data of one fulfillment cycle. It has no concurrency control of its own.
///
/// A generation is consumed once its result has been written, so the consumed flag is derived
/// from the slot rather than stored next to it.
pub(crate) struct GenerationState<T, E> {
    result: Option<Outcome<T, E>>,
}

impl<T, E> GenerationState<T, E> {
    pub(crate) const fn new() -> Self {
        Self { result: None }
    }

    pub(crate) fn is_consumed(&self) -> bool {
        self.result.is_some()
    }

    pub(crate) fn outcome(&self) -> Option<&Outcome<T, E>> {
        self.result.as_ref()
    }

    /// Writes the result of this generation.
    ///
    /// Returns the rejected outcome if the generation was already consumed.
    pub(crate) fn complete(&mut self, outcome: Outcome<T, E>) -> Result<(), Outcome<T, E>> {
        if self.is_consumed() {
            return Err(outcome);
        }
        self.result = Some(outcome);
        Ok(())
    }
}

/// The readable view of one generation: its state plus the wakeup for threads waiting on it.
///
/// Waiters hold an `Arc<Generation>` and never touch the cell that handed it out, so a reset
/// of the cell cannot tear what they observe.
pub(crate) struct Generation<T, E> {
    state: Mutex<GenerationState<T, E>>,
    resolved: Condvar,
}

impl<T, E> fmt::Debug for Generation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

impl<T, E> Generation<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(GenerationState::new()),
            resolved: Condvar::new(),
        }
    }

    pub(crate) fn is_consumed(&self) -> bool {
        self.state.lock().is_consumed()
    }

    /// Resolves this generation, waking every waiter.
    ///
    /// If another writer won the race, the rejected outcome is handed back so that the caller
    /// drops it after releasing its own locks.
    pub(crate) fn complete(&self, outcome: Outcome<T, E>) -> Result<(), Outcome<T, E>> {
        let mut state = self.state.lock();
        let result = state.complete(outcome);
        drop(state);
        if result.is_ok() {
            self.resolved.notify_all();
        }
        result
    }

    /// Resolves this generation with a broken contract if nothing was written yet.
    pub(crate) fn break_contract(&self) -> bool {
        self.complete(Outcome::BrokenContract).is_ok()
    }

    /// Reads the outcome without blocking.
    pub(crate) fn try_read<R>(&self, f: impl FnOnce(&Outcome<T, E>) -> R) -> Option<R> {
        self.state.lock().outcome().map(f)
    }

    /// Blocks until the generation is resolved.
    pub(crate) fn wait<R>(&self, f: impl FnOnce(&Outcome<T, E>) -> R) -> R {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.outcome() {
                return f(outcome);
            }
            self.resolved.wait(&mut state);
        }
    }

    /// Blocks until the generation is resolved or `deadline` passes.
    pub(crate) fn wait_until<R>(
        &self,
        deadline: Instant,
        f: impl FnOnce(&Outcome<T, E>) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        loop {
            if state.is_consumed() {
                break;
            }
            if self.resolved.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.outcome().map(f)
    }
}

/// The write capability of one generation.
///
/// The cell owns the writer of its current generation, and [`Promise`]s may share it. When the
/// last owner goes away the generation can never be written again, so it is resolved with a
/// broken contract instead of leaving its waiters blocked forever.
///
/// [`Promise`]: crate::oneshot::Promise
pub(crate) struct Writer<T, E> {
    generation: Arc<Generation<T, E>>,
}

impl<T, E> fmt::Debug for Writer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("generation", &self.generation)
            .finish()
    }
}

impl<T, E> Writer<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            generation: Arc::new(Generation::new()),
        }
    }

    pub(crate) fn generation(&self) -> &Arc<Generation<T, E>> {
        &self.generation
    }
}

impl<T, E> Drop for Writer<T, E> {
    fn drop(&mut self) {
        if self.generation.break_contract() {
            tracing::debug!("generation orphaned before completion; resolved as broken contract");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use std::time::Instant;

    use super::*;

    #[test]
    fn state_completes_once() {
        let mut state = GenerationState::<u32, ()>::new();
        assert!(!state.is_consumed());
        assert!(state.complete(Outcome::Value(1)).is_ok());
        assert!(state.is_consumed());
        match state.complete(Outcome::Value(2)) {
            Err(Outcome::Value(2)) => {}
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(state.outcome().and_then(Outcome::value), Some(&1));
    }

    #[test]
    fn wait_until_times_out() {
        let generation = Generation::<u32, ()>::new();
        let deadline = Instant::now() + Duration::from_millis(10);
        assert!(generation.wait_until(deadline, |_| ()).is_none());
    }

    #[test]
    fn wait_wakes_on_complete() {
        let generation = Arc::new(Generation::<u32, ()>::new());
        let waiter = {
            let generation = generation.clone();
            thread::spawn(move || generation.wait(|o| o.value().copied()))
        };
        thread::sleep(Duration::from_millis(10));
        assert!(generation.complete(Outcome::Value(5)).is_ok());
        assert_eq!(waiter.join().unwrap(), Some(5));
    }

    #[test]
    fn dropping_writer_breaks_pending_generation() {
        let writer = Writer::<u32, ()>::new();
        let generation = writer.generation().clone();
        drop(writer);
        assert!(matches!(
            generation.try_read(|o| matches!(o, Outcome::BrokenContract)),
            Some(true)
        ));
    }

    #[test]
    fn dropping_writer_keeps_completed_value() {
        let writer = Writer::<u32, ()>::new();
        let generation = writer.generation().clone();
        assert!(generation.complete(Outcome::Value(3)).is_ok());
        drop(writer);
        assert_eq!(generation.try_read(|o| o.value().copied()), Some(Some(3)));
    }
}
