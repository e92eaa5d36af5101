use crate::polling::events::PollEvent;

pub trait PollEventSink: Send {
    fn emit(&mut self, event: PollEvent);
}

/// Discards every event. Used by the plain `poll` entry points.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PollEventSink for NoopSink {
    fn emit(&mut self, _event: PollEvent) {}
}
