#![allow(dead_code)]

use std::time::Duration;

use runcast::broadcast::{StreamEvent, Subscription};
use runcast::registry::{ProcessRegistry, RunId, RunState};

pub use runcast_test_utils::{init_tracing, with_timeout};

/// Poll until the run reaches a terminal state.
pub async fn wait_terminal(registry: &ProcessRegistry, id: &RunId) -> RunState {
    with_timeout(async {
        loop {
            let state = registry.state(id).expect("run should exist");
            if state.is_terminal() {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

/// Poll until the run's log holds at least `n` lines.
pub async fn wait_lines(registry: &ProcessRegistry, id: &RunId, n: u64) {
    with_timeout(async {
        loop {
            let snapshot = registry.get_run(id).expect("run should exist");
            if snapshot.line_count >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

/// Drain a subscription until it closes.
pub async fn collect(mut sub: Subscription) -> Vec<StreamEvent> {
    with_timeout(async {
        let mut events = Vec::new();
        while let Some(event) = sub.next().await {
            events.push(event);
        }
        events
    })
    .await
}

/// `(index, data)` of the output events.
pub fn outputs(events: &[StreamEvent]) -> Vec<(u64, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Output { index, data, .. } => Some((*index, data.clone())),
            StreamEvent::Exit { .. } => None,
        })
        .collect()
}
