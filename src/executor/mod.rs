// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

//! Parallel execution framework for SSH script runs.

mod parallel;
mod pool;
mod result_types;
mod session;

// Re-export public types
pub use parallel::ParallelExecutor;
pub use pool::{BoundedPool, Submission};
pub use result_types::{
    CancelStage, ExecutionError, HostFailure, Outcome, RunResult, SessionError, TargetOutcome,
};
pub use session::{SessionDriver, SessionState, DEFAULT_CONNECT_TIMEOUT};
