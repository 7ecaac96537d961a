use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;

use runcast::broadcast::StreamEvent;
use runcast::exec::ToolProbe;
use runcast::install::ProgressSink;
use runcast::registry::RunId;
use runcast::update::HeadQuery;

/// Probe answering from a fixed set of available program names.
#[derive(Debug, Default)]
pub struct StaticProbe {
    available: HashSet<String>,
    probed: Mutex<Vec<String>>,
}

impl StaticProbe {
    pub fn with<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: programs.into_iter().map(Into::into).collect(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Programs probed so far, in order.
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl ToolProbe for StaticProbe {
    fn probe<'a>(
        &'a self,
        program: &'a str,
        _args: &'a [&'a str],
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        self.probed.lock().unwrap().push(program.to_string());
        let available = self.available.contains(program);
        Box::pin(async move { available })
    }
}

/// Head query with a fixed answer.
#[derive(Debug, Default)]
pub struct StaticHeadQuery(pub Option<String>);

impl HeadQuery for StaticHeadQuery {
    fn current_branch<'a>(
        &'a self,
        _repo: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let answer = self.0.clone();
        Box::pin(async move { answer })
    }
}

/// Sink that remembers every banner and event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    steps: Mutex<Vec<String>>,
    events: Mutex<Vec<(RunId, StreamEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<(RunId, StreamEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Output text of every event, in delivery order.
    pub fn output_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|(_, event)| match event {
                StreamEvent::Output { data, .. } => Some(data),
                StreamEvent::Exit { .. } => None,
            })
            .collect()
    }

    pub fn has_step(&self, needle: &str) -> bool {
        self.steps().iter().any(|s| s.contains(needle))
    }
}

impl ProgressSink for RecordingSink {
    fn step(&self, message: &str) {
        self.steps.lock().unwrap().push(message.to_string());
    }

    fn event(&self, run_id: &RunId, event: &StreamEvent) {
        self.events
            .lock()
            .unwrap()
            .push((run_id.clone(), event.clone()));
    }
}
