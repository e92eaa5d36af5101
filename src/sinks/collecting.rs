use crate::polling::events::{PollEvent, PollEventKind, PollOutcome};
use crate::polling::sink::PollEventSink;

/// An in-memory event sink used to collect the events of a poll session.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Vec<PollEvent>,
}

impl CollectingSink {
    /// Create a new, empty collecting sink.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Borrow all collected events.
    pub fn events(&self) -> &[PollEvent] {
        &self.events
    }

    /// Consume the sink and return the collected events.
    pub fn into_events(self) -> Vec<PollEvent> {
        self.events
    }

    /// Number of fetch attempts seen so far.
    pub fn attempts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, PollEventKind::AttemptStarted))
            .count()
    }

    /// How the session ended, if it has.
    pub fn outcome(&self) -> Option<PollOutcome> {
        self.events.iter().rev().find_map(|e| match e.kind {
            PollEventKind::Settled { outcome } => Some(outcome),
            _ => None,
        })
    }
}

impl PollEventSink for CollectingSink {
    fn emit(&mut self, event: PollEvent) {
        self.events.push(event);
    }
}
