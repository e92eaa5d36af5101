use std::io::Write;

use crate::polling::events::PollEvent;
use crate::polling::sink::PollEventSink;

/// Writes each event as one line of JSON. Backs `hspoll watch --events`.
///
/// Write failures are logged and otherwise ignored; a broken pipe must not
/// end the poll session.
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
}

impl JsonLinesSink<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> PollEventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: PollEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialise poll event");
                return;
            }
        };

        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write poll event");
        }
    }
}
