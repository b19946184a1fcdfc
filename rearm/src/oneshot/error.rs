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

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// The default failure type of a channel.
///
/// It is reference counted so that every receiver of a generation can observe the same failure.
pub type Failure = Arc<dyn StdError + Send + Sync + 'static>;

/// An error returned when waiting for the result of a generation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecvError<E> {
    /// The producer resolved the generation with an application failure.
    #[error("the generation failed: {0}")]
    Failed(#[source] E),

    /// The producer went away before resolving the generation.
    #[error("the generation was abandoned by its sender")]
    BrokenContract,

    /// The receiver is not attached to a channel.
    #[error("receiving on an empty handle")]
    NoState,
}
