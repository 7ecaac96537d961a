// src/broadcast/subscription.rs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::registry::{ProcessRegistry, ReplayPoint, RunEvent, RunId, RunState};

use super::{LineOp, StreamEvent};

/// One viewer's feed for one run.
///
/// Dropping the subscription detaches it.
pub struct Subscription {
    id: u64,
    run_id: RunId,
    /// Next line index this viewer has not seen yet.
    cursor: u64,
    /// Highest event sequence number already delivered.
    last_seq: u64,
    pending: VecDeque<StreamEvent>,
    rx: Option<broadcast::Receiver<RunEvent>>,
    terminal: Option<RunState>,
    registry: ProcessRegistry,
    viewers: Arc<Mutex<HashMap<RunId, usize>>>,
    attached: bool,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("run_id", &self.run_id)
            .field("cursor", &self.cursor)
            .field("last_seq", &self.last_seq)
            .field("pending", &self.pending.len())
            .field("attached", &self.attached)
            .finish()
    }
}

impl Subscription {
    pub(super) fn new(
        id: u64,
        run_id: RunId,
        point: ReplayPoint,
        registry: ProcessRegistry,
        viewers: Arc<Mutex<HashMap<RunId, usize>>>,
    ) -> Self {
        let mut sub = Self {
            id,
            run_id,
            cursor: 0,
            last_seq: 0,
            pending: VecDeque::new(),
            rx: None,
            terminal: None,
            registry,
            viewers,
            attached: true,
        };
        sub.load(point, None);
        sub
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Next line index this viewer has not received.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Terminal state of the run, once this feed has seen it.
    pub fn terminal_state(&self) -> Option<&RunState> {
        self.terminal.as_ref()
    }

    /// Queue the replayed lines from `point` and adopt its receiver.
    ///
    /// `delivered_upto` is the cursor before a resync: lines below it were
    /// already sent once, so they are re-sent as overwrites of that index.
    fn load(&mut self, point: ReplayPoint, delivered_upto: Option<u64>) {
        for line in point.lines {
            let op = match delivered_upto {
                Some(upto) if line.index < upto => LineOp::Overwrite,
                _ => LineOp::Append,
            };
            self.pending.push_back(StreamEvent::Output {
                op,
                index: line.index,
                data: line.text,
            });
        }
        self.cursor = self.cursor.max(point.len);
        self.last_seq = point.seq;

        match point.terminal {
            Some(state) => {
                self.pending.push_back(StreamEvent::exit(&state));
                self.terminal = Some(state);
                self.rx = None;
            }
            None => self.rx = Some(point.receiver),
        }
    }

    /// Rebuild the feed from the log after this viewer fell behind.
    fn resync(&mut self) -> bool {
        // Re-read the last delivered line: it may have been overwritten
        // while events were being dropped.
        let from = self.cursor.saturating_sub(1);
        match self.registry.replay_point(&self.run_id, from) {
            Ok(point) => {
                debug!(
                    run_id = %self.run_id,
                    subscription = self.id,
                    from,
                    "viewer lagged; resyncing from log"
                );
                let delivered = self.cursor;
                self.load(point, Some(delivered));
                true
            }
            Err(err) => {
                warn!(run_id = %self.run_id, error = %err, "resync failed");
                false
            }
        }
    }

    fn closed_exit(&self) -> StreamEvent {
        match self.registry.state(&self.run_id) {
            Ok(state) if state.is_terminal() => StreamEvent::exit(&state),
            _ => StreamEvent::Exit {
                state: "evicted".to_string(),
                code: None,
                error: None,
            },
        }
    }

    /// Wait for the next event. Returns `None` after the `Exit` event.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let rx = self.rx.as_mut()?;
            match rx.recv().await {
                Ok(event) => {
                    if event.seq() <= self.last_seq {
                        continue;
                    }
                    self.last_seq = event.seq();
                    match event {
                        RunEvent::Line { line, .. } => {
                            self.cursor = self.cursor.max(line.index + 1);
                            let op = if line.overwrite {
                                LineOp::Overwrite
                            } else {
                                LineOp::Append
                            };
                            return Some(StreamEvent::Output {
                                op,
                                index: line.index,
                                data: line.text,
                            });
                        }
                        RunEvent::Finished { state, .. } => {
                            self.rx = None;
                            let event = StreamEvent::exit(&state);
                            self.terminal = Some(state);
                            return Some(event);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(run_id = %self.run_id, skipped, "subscription lagged");
                    if !self.resync() {
                        self.rx = None;
                        return Some(self.closed_exit());
                    }
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return Some(self.closed_exit());
                }
            }
        }
    }

    /// Turn the subscription into a stream that ends after `Exit`.
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send {
        futures_util::stream::unfold(self, |mut sub| async move {
            let event = sub.next().await?;
            Some((event, sub))
        })
    }

    pub(super) fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.rx = None;
        self.pending.clear();

        let mut viewers = self.viewers.lock();
        if let Some(count) = viewers.get_mut(&self.run_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                viewers.remove(&self.run_id);
            }
        }
        debug!(run_id = %self.run_id, subscription = self.id, "viewer detached");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
