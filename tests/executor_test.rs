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

//! End-to-end tests of the parallel executor against the in-memory transport.

mod common;

use common::{commands, targets, MockTransport};
use sshauto::executor::{ExecutionError, ParallelExecutor, SessionError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_auth_failure_among_five_targets() {
    let transport = Arc::new(
        MockTransport::new()
            .fail_auth_for("node3")
            .with_shell_delay(Duration::from_millis(30)),
    );
    let executor = ParallelExecutor::new(targets(5), 2, transport.clone());

    let run = executor.execute(&commands(&["echo hi", "exit"])).await;

    assert_eq!(run.completed(), 5);
    assert_eq!(run.succeeded, 4);
    assert_eq!(run.failed(), 1);
    assert_eq!(run.failures[0].host, "node3");
    assert!(run.failures[0].reason.to_string().contains("authentication"));
    assert!(transport.peak_sessions() <= 2);
    assert!(run.not_started.is_empty());

    match run.into_result() {
        Err(ExecutionError::TargetsFailed { failed, total, .. }) => {
            assert_eq!(failed, 1);
            assert_eq!(total, 5);
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_limit() {
    let transport = Arc::new(MockTransport::new().with_shell_delay(Duration::from_millis(20)));
    let executor = ParallelExecutor::new(targets(20), 3, transport.clone());

    let run = executor.execute(&commands(&["uptime"])).await;

    assert_eq!(run.succeeded, 20);
    assert!(run.is_success());
    assert!(transport.peak_sessions() <= 3);
    assert!(transport.peak_sessions() >= 1);
    assert_eq!(transport.active_sessions(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_target_yields_exactly_one_outcome() {
    let transport = Arc::new(MockTransport::new());
    let executor = ParallelExecutor::new(targets(12), 4, transport.clone());

    let run = executor.execute(&commands(&["true"])).await;

    assert_eq!(run.succeeded + run.failed(), 12);
    assert_eq!(transport.dialed(), 12);
    // Every established session is closed exactly once.
    assert_eq!(transport.closed(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_commands_arrive_in_order_on_every_target() {
    let script: Vec<String> = (0..50).map(|i| format!("echo step-{i}")).collect();
    let mut script = script;
    // Duplicates and blank lines are sent as-is.
    script.push(String::new());
    script.push("echo step-0".to_string());

    let transport = Arc::new(MockTransport::new());
    let executor = ParallelExecutor::new(targets(4), 4, transport.clone());

    let run = executor.execute(&script).await;
    assert!(run.is_success());

    for i in 1..=4 {
        assert_eq!(transport.received(&format!("node{i}")), script);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_do_not_affect_other_targets() {
    let transport = Arc::new(
        MockTransport::new()
            .fail_auth_for("node1")
            .fail_shell_for("node2")
            .hang_dial_for("node3"),
    );
    let executor = ParallelExecutor::new(targets(6), 6, transport.clone())
        .with_connect_timeout(Duration::from_millis(200));

    let run = executor.execute(&commands(&["echo ok"])).await;

    assert_eq!(run.succeeded, 3);
    assert_eq!(run.failed(), 3);
    for host in ["node4", "node5", "node6"] {
        assert_eq!(transport.received(host), vec!["echo ok".to_string()]);
    }

    let reason = |host: &str| {
        &run.failures
            .iter()
            .find(|f| f.host == host)
            .unwrap_or_else(|| panic!("missing failure for {host}"))
            .reason
    };
    assert!(matches!(reason("node1"), SessionError::Connect(_)));
    assert!(matches!(reason("node2"), SessionError::Shell(_)));
    assert!(matches!(reason("node3"), SessionError::ConnectTimeout(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_tasks_release_their_slots() {
    let transport = Arc::new(
        MockTransport::new()
            .fail_auth_for("node1")
            .fail_auth_for("node2")
            .fail_shell_for("node3"),
    );
    let executor = ParallelExecutor::new(targets(6), 1, transport.clone());

    let run = tokio::time::timeout(Duration::from_secs(10), executor.execute(&commands(&["id"])))
        .await
        .expect("later targets must still be admitted");

    assert_eq!(run.failed(), 3);
    assert_eq!(run.succeeded, 3);
    assert_eq!(transport.peak_sessions(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_is_drained_so_streaming_does_not_stall() {
    let transport = Arc::new(
        MockTransport::new()
            .with_pipe_capacity(256)
            .with_output_per_line(64 * 1024),
    );
    let script: Vec<String> = (0..20).map(|i| format!("cat big-{i}")).collect();
    let executor = ParallelExecutor::new(targets(2), 2, transport.clone());

    let run = tokio::time::timeout(Duration::from_secs(10), executor.execute(&script))
        .await
        .expect("undrained output would stall command delivery");

    assert!(run.is_success());
    assert_eq!(transport.received("node1"), script);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_skips_unadmitted_targets_and_returns() {
    let mut transport = MockTransport::new();
    for i in 1..=6 {
        transport = transport.hang_shell_for(&format!("node{i}"));
    }
    let transport = Arc::new(transport);
    let cancel = CancellationToken::new();
    let executor = ParallelExecutor::new(targets(6), 2, transport.clone())
        .with_cancellation(cancel.clone());

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let run = tokio::time::timeout(Duration::from_secs(5), executor.execute(&commands(&["sleep 999"])))
        .await
        .expect("executor must return after cancellation");
    trigger.await.unwrap();

    // Two sessions were admitted and stuck waiting for exit; the rest never ran.
    assert_eq!(run.completed(), 2);
    assert_eq!(run.succeeded, 0);
    assert!(run.failures.iter().all(|f| f.reason.is_cancelled()));
    assert_eq!(run.not_started, vec!["node3", "node4", "node5", "node6"]);
    assert_eq!(transport.dialed(), 2);
    assert_eq!(transport.active_sessions(), 0);
    assert!(run.cancelled);

    assert!(matches!(
        run.into_result(),
        Err(ExecutionError::TargetsFailed { failed: 2, total: 6, .. })
    ));
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let transport = Arc::new(MockTransport::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let executor =
        ParallelExecutor::new(targets(3), 2, transport.clone()).with_cancellation(cancel);

    let run = executor.execute(&commands(&["echo hi"])).await;

    assert_eq!(run.completed(), 0);
    assert_eq!(run.not_started.len(), 3);
    assert_eq!(transport.dialed(), 0);
    assert!(matches!(
        run.into_result(),
        Err(ExecutionError::Cancelled { not_started: 3 })
    ));
}

#[tokio::test]
async fn test_zero_concurrency_is_treated_as_one() {
    let transport = Arc::new(MockTransport::new());
    let executor = ParallelExecutor::new(targets(3), 0, transport.clone());

    let run = tokio::time::timeout(Duration::from_secs(5), executor.execute(&commands(&["ls"])))
        .await
        .expect("a zero limit must not deadlock");

    assert_eq!(run.succeeded, 3);
    assert_eq!(transport.peak_sessions(), 1);
}

#[tokio::test]
async fn test_empty_target_list() {
    let executor = ParallelExecutor::new(Vec::new(), 4, Arc::new(MockTransport::new()));
    let run = executor.execute(&commands(&["ls"])).await;
    assert_eq!(run.completed(), 0);
    assert!(run.into_result().is_ok());
}
