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

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

//! # Rearm - resettable one-shot handoff
//!
//! `rearm` provides a one-shot channel for blocking threads that can be rearmed after each
//! handoff. One producer delivers a single value, or a failure, to any number of consumers; then
//! either side resets the channel and the next handoff reuses the same handles.
//!
//! ## Features
//!
//! * [`oneshot::channel`]: A resettable one-shot channel carrying a value or a failure.
//! * [`signal::channel`]: The same channel without a payload, used as a completion signal.
//!
//! ## Generations
//!
//! Each fulfillment cycle of a channel is a *generation*. A generation is resolved exactly once:
//! by the producer delivering a value, delivering a failure, or going away. A reset replaces the
//! current generation with a fresh one instead of clearing it in place, so a consumer that is
//! already waiting keeps observing the generation it started waiting on.
//!
//! ## Thread Safety
//!
//! All handles implement `Send` and `Sync` when the payload and failure types do. Waiting is
//! blocking: the waiting thread is parked, and no lock shared with the other handles is held
//! while it waits.

pub(crate) mod internal;

pub mod oneshot;
pub mod signal;

#[cfg(test)]
mod tests {
    use crate::oneshot;
    use crate::signal;

    #[test]
    fn assert_send_and_sync() {
        fn do_assert_send_and_sync<T: Send + Sync>() {}
        do_assert_send_and_sync::<oneshot::Sender<i64>>();
        do_assert_send_and_sync::<oneshot::Receiver<i64>>();
        do_assert_send_and_sync::<oneshot::Promise<i64>>();
        do_assert_send_and_sync::<oneshot::RecvError<oneshot::Failure>>();
        do_assert_send_and_sync::<signal::Sender>();
        do_assert_send_and_sync::<signal::Receiver>();
        do_assert_send_and_sync::<signal::Promise>();
    }

    #[test]
    fn assert_unpin() {
        fn do_assert_unpin<T: Unpin>() {}
        do_assert_unpin::<oneshot::Sender<i64>>();
        do_assert_unpin::<oneshot::Receiver<i64>>();
        do_assert_unpin::<oneshot::Promise<i64>>();
        do_assert_unpin::<oneshot::RecvError<i64>>();
        do_assert_unpin::<signal::Sender>();
        do_assert_unpin::<signal::Receiver>();
        do_assert_unpin::<signal::Promise>();
    }
}
