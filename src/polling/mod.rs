// src/polling/mod.rs

//! Generic status poller.
//!
//! Submitting a build, deploy or sandbox sync returns immediately; the job
//! then runs remotely and the only way to learn its fate is to keep asking.
//! [`Poller`] turns that into a single future:
//!
//! - wait one delay, fetch the status, repeat
//! - `SUCCESS` resolves with the payload
//! - `ERROR` / `FAILURE` / `REVERTED` rejects with the payload
//! - a failing fetch rejects with its error, without retrying
//!
//! The next wait only starts after the current fetch has settled, so a slow
//! API never sees two requests from the same session at once.
//!
//! There is no attempt cap and no overall timeout. Callers that need one can
//! pass a deadline as the cancellation future of [`Poller::poll_until`].

pub mod error;
pub mod events;
pub mod sink;
pub mod state;

pub use error::{InvalidDelay, PollError};
pub use events::{PollEvent, PollEventKind, PollOutcome};
pub use sink::{NoopSink, PollEventSink};
pub use state::{Envelope, PollStatus, PollingState, StatusPayload};

use std::future::{self, Future};
use std::time::Duration;

use tracing::Instrument;

use crate::session_id::SessionId;

/// Delay between attempts when none is given.
pub const DEFAULT_POLLING_DELAY: Duration = Duration::from_millis(5000);

/// Poll configuration. Cheap to copy; every `poll*` call is an independent
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    delay: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            delay: DEFAULT_POLLING_DELAY,
        }
    }
}

impl Poller {
    pub fn new(delay: Duration) -> Result<Self, InvalidDelay> {
        if delay.is_zero() {
            return Err(InvalidDelay);
        }
        Ok(Self { delay })
    }

    pub fn from_millis(delay_ms: u64) -> Result<Self, InvalidDelay> {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Same poller, different delay.
    pub fn with_delay(self, delay: Duration) -> Result<Self, InvalidDelay> {
        Self::new(delay)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delay in whole milliseconds, saturating at `u64::MAX`.
    pub fn delay_ms(&self) -> u64 {
        u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX)
    }

    /// Poll until a terminal status or a fetch error.
    pub async fn poll<T, E, F, Fut>(&self, fetch: F) -> Result<T, PollError<T, E>>
    where
        T: PollStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, E>>,
    {
        self.poll_until_observed(fetch, future::pending::<()>(), &mut NoopSink)
            .await
    }

    /// Same as [`Poller::poll`], reporting each step to `sink`.
    pub async fn poll_observed<T, E, F, Fut>(
        &self,
        fetch: F,
        sink: &mut dyn PollEventSink,
    ) -> Result<T, PollError<T, E>>
    where
        T: PollStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, E>>,
    {
        self.poll_until_observed(fetch, future::pending::<()>(), sink)
            .await
    }

    /// Same as [`Poller::poll`], but stops with [`PollError::Cancelled`] as
    /// soon as `cancel` completes. A fetch still in flight at that point is
    /// dropped.
    pub async fn poll_until<T, E, F, Fut, C>(
        &self,
        fetch: F,
        cancel: C,
    ) -> Result<T, PollError<T, E>>
    where
        T: PollStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, E>>,
        C: Future<Output = ()>,
    {
        self.poll_until_observed(fetch, cancel, &mut NoopSink).await
    }

    pub async fn poll_until_observed<T, E, F, Fut, C>(
        &self,
        fetch: F,
        cancel: C,
        sink: &mut dyn PollEventSink,
    ) -> Result<T, PollError<T, E>>
    where
        T: PollStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, E>>,
        C: Future<Output = ()>,
    {
        let session_id = SessionId::new();
        let span = tracing::debug_span!(
            "poll_session",
            session = %session_id,
            delay_ms = self.delay_ms(),
        );

        self.run_session(&session_id, fetch, cancel, sink)
            .instrument(span)
            .await
    }

    async fn run_session<T, E, F, Fut, C>(
        &self,
        session_id: &SessionId,
        mut fetch: F,
        cancel: C,
        sink: &mut dyn PollEventSink,
    ) -> Result<T, PollError<T, E>>
    where
        T: PollStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, E>>,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        sink.emit(PollEvent::new(
            session_id,
            0,
            PollEventKind::SessionStarted {
                delay_ms: self.delay_ms(),
            },
        ));

        let mut attempt: u64 = 0;

        loop {
            // ---- wait one delay ----
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    return Err(cancelled(session_id, attempt, sink));
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            // ---- fetch ----
            attempt = next_attempt(attempt);
            sink.emit(PollEvent::new(session_id, attempt, PollEventKind::AttemptStarted));
            tracing::trace!(attempt, "fetching status");

            let response = tokio::select! {
                biased;
                _ = &mut cancel => {
                    return Err(cancelled(session_id, attempt, sink));
                }
                response = fetch() => response,
            };

            let data = match response {
                Ok(envelope) => envelope.data,
                Err(err) => {
                    tracing::debug!(attempt, "status fetch failed, stopping");
                    sink.emit(PollEvent::new(session_id, attempt, PollEventKind::FetchFailed));
                    settle(session_id, attempt, PollOutcome::Rejected, sink);
                    return Err(PollError::Fetch(err));
                }
            };

            // ---- evaluate ----
            sink.emit(PollEvent::new(
                session_id,
                attempt,
                PollEventKind::AttemptFinished {
                    status: data.status().to_string(),
                },
            ));

            match data.state() {
                Some(PollingState::Success) => {
                    tracing::debug!(attempt, "job succeeded");
                    settle(session_id, attempt, PollOutcome::Resolved, sink);
                    return Ok(data);
                }
                Some(state) if state.is_failure() => {
                    tracing::debug!(attempt, status = %state, "job reached a failure status");
                    settle(session_id, attempt, PollOutcome::Rejected, sink);
                    return Err(PollError::Terminal(data));
                }
                _ => {
                    tracing::trace!(attempt, status = data.status(), "job still running");
                }
            }
        }
    }
}

/// No attempt cap exists, so the counter saturates instead of wrapping.
fn next_attempt(attempt: u64) -> u64 {
    attempt.saturating_add(1)
}

fn settle(
    session_id: &SessionId,
    attempt: u64,
    outcome: PollOutcome,
    sink: &mut dyn PollEventSink,
) {
    sink.emit(PollEvent::new(
        session_id,
        attempt,
        PollEventKind::Settled { outcome },
    ));
}

fn cancelled<T: PollStatus, E>(
    session_id: &SessionId,
    attempt: u64,
    sink: &mut dyn PollEventSink,
) -> PollError<T, E> {
    tracing::debug!(attempt, "polling cancelled");
    settle(session_id, attempt, PollOutcome::Cancelled, sink);
    PollError::Cancelled
}

/// Poll `fetch` every `delay` until a terminal status.
///
/// A zero delay settles immediately with [`PollError::InvalidDelay`] and
/// never calls `fetch`.
pub async fn poll<T, E, F, Fut>(fetch: F, delay: Duration) -> Result<T, PollError<T, E>>
where
    T: PollStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Envelope<T>, E>>,
{
    Poller::new(delay)?.poll(fetch).await
}

/// [`poll`] with [`DEFAULT_POLLING_DELAY`].
pub async fn poll_default<T, E, F, Fut>(fetch: F) -> Result<T, PollError<T, E>>
where
    T: PollStatus,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Envelope<T>, E>>,
{
    Poller::default().poll(fetch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collecting::CollectingSink;
    use std::future::{ready, Ready};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type Reply = Result<Envelope<StatusPayload>, String>;

    /// Fetch function that replays `script` and counts its calls.
    ///
    /// Once the script runs out it keeps answering with its last entry.
    fn scripted(
        script: Vec<Reply>,
    ) -> (impl FnMut() -> Ready<Reply>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let fetch = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let reply = script
                .get(n)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or_else(|| Err("empty script".to_string()));
            ready(reply)
        };

        (fetch, calls)
    }

    fn status(s: &str) -> Reply {
        Ok(Envelope::new(StatusPayload::new(s)))
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_after_k_plus_one_calls() {
        let (fetch, calls) = scripted(vec![
            status("STARTED"),
            status("STARTED"),
            status("STARTED"),
            status("SUCCESS"),
        ]);

        let start = Instant::now();
        let result = poll(fetch, Duration::from_millis(100)).await;

        assert_eq!(result.unwrap().status, "SUCCESS");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn example_build_resolves_after_two_ticks() {
        let (fetch, calls) = scripted(vec![
            status("STARTED"),
            Ok(Envelope::new(
                StatusPayload::new("SUCCESS").with_field("buildId", 42),
            )),
        ]);

        let start = Instant::now();
        let data = poll(fetch, Duration::from_millis(100)).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(200));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({ "status": "SUCCESS", "buildId": 42 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_with_each_failure_status() {
        for state in PollingState::TERMINAL_FAILURES {
            let (fetch, calls) = scripted(vec![
                status("STARTED"),
                Ok(Envelope::new(
                    StatusPayload::new(state.as_str()).with_field("reason", "boom"),
                )),
            ]);

            let err = poll(fetch, Duration::from_millis(50)).await.unwrap_err();

            let payload = err.terminal().expect("terminal payload");
            assert_eq!(payload.status, state.as_str());
            assert_eq!(payload.get("reason"), Some(&serde_json::json!("boom")));
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_statuses_keep_polling() {
        let (fetch, calls) = scripted(vec![
            status("QUEUED"),
            status("success"),
            status("BUILDING"),
            status("SUCCESS"),
        ]);

        let result = poll(fetch, Duration::from_millis(10)).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_passed_through_without_retry() {
        let (fetch, calls) = scripted(vec![
            status("STARTED"),
            Err("connection reset".to_string()),
            status("SUCCESS"),
        ]);

        let err = poll(fetch, Duration::from_millis(100)).await.unwrap_err();

        assert_eq!(err.fetch_error().map(String::as_str), Some("connection reset"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_calls_after_settling() {
        let (fetch, calls) = scripted(vec![
            status("STARTED"),
            status("SUCCESS"),
            status("STARTED"),
            status("FAILURE"),
        ]);

        let result = poll(fetch, Duration::from_millis(100)).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetches_never_overlap() {
        let delay = Duration::from_millis(100);
        let fetch_time = Duration::from_millis(250);

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            let starts = Arc::clone(&starts);
            let calls = Arc::clone(&calls);
            move || {
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                let starts = Arc::clone(&starts);
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    starts.lock().unwrap().push(Instant::now());
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);

                    tokio::time::sleep(fetch_time).await;

                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    let s = if n < 2 { "STARTED" } else { "SUCCESS" };
                    Ok::<_, String>(Envelope::new(StatusPayload::new(s)))
                }
            }
        };

        let start = Instant::now();
        poll(fetch, delay).await.unwrap();

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[0] - start, delay);
        for pair in starts.windows(2) {
            // next attempt waits for the previous fetch plus one full delay
            assert_eq!(pair[1] - pair[0], fetch_time + delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_delay_before_first_call() {
        let first_call: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&first_call);

        let fetch = move || {
            seen.lock().unwrap().get_or_insert_with(Instant::now);
            ready(Ok::<_, String>(Envelope::new(StatusPayload::new("SUCCESS"))))
        };

        let start = Instant::now();
        poll_default(fetch).await.unwrap();

        let first = first_call.lock().unwrap().expect("fetch was called");
        assert_eq!(first - start, DEFAULT_POLLING_DELAY);
        assert_eq!(DEFAULT_POLLING_DELAY, Duration::from_millis(5000));
        assert_eq!(Poller::default().delay(), DEFAULT_POLLING_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_is_rejected_without_fetching() {
        let (fetch, calls) = scripted(vec![status("SUCCESS")]);

        let err = poll(fetch, Duration::ZERO).await.unwrap_err();

        assert!(matches!(err, PollError::InvalidDelay(InvalidDelay)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(Poller::from_millis(0), Err(InvalidDelay));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_fetching() {
        let (fetch, calls) = scripted(vec![status("STARTED")]);
        let poller = Poller::from_millis(100).unwrap();

        let cancel = tokio::time::sleep(Duration::from_millis(350));
        let err = poller.poll_until(fetch, cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_in_flight_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetch = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(Envelope::new(StatusPayload::new("SUCCESS")))
            }
        };

        let poller = Poller::from_millis(100).unwrap();
        let start = Instant::now();
        let err = poller
            .poll_until(fetch, tokio::time::sleep(Duration::from_millis(500)))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_sees_each_attempt_and_one_settlement() {
        let (fetch, _calls) = scripted(vec![status("STARTED"), status("REVERTED")]);
        let mut sink = CollectingSink::new();

        let err = Poller::from_millis(20)
            .unwrap()
            .poll_observed(fetch, &mut sink)
            .await
            .unwrap_err();
        assert!(err.terminal().is_some());

        let kinds: Vec<PollEventKind> = sink.events().iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                PollEventKind::SessionStarted { delay_ms: 20 },
                PollEventKind::AttemptStarted,
                PollEventKind::AttemptFinished { status: "STARTED".to_string() },
                PollEventKind::AttemptStarted,
                PollEventKind::AttemptFinished { status: "REVERTED".to_string() },
                PollEventKind::Settled { outcome: PollOutcome::Rejected },
            ]
        );
        assert_eq!(sink.attempts(), 2);
        assert_eq!(sink.outcome(), Some(PollOutcome::Rejected));

        let session = &sink.events()[0].session_id;
        assert!(sink.events().iter().all(|e| &e.session_id == session));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_sessions_run_concurrently() {
        let (fast, fast_calls) = scripted(vec![status("SUCCESS")]);
        let (slow, slow_calls) = scripted(vec![status("STARTED"), status("STARTED"), status("ERROR")]);

        let (a, b) = tokio::join!(
            poll(fast, Duration::from_millis(100)),
            poll(slow, Duration::from_millis(100)),
        );

        assert!(a.is_ok());
        assert!(b.unwrap_err().terminal().is_some());
        assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow_calls.load(Ordering::SeqCst), 3);
    }

    fn kinds(sink: &CollectingSink) -> Vec<(u64, PollEventKind)> {
        sink.events()
            .iter()
            .map(|e| (e.attempt, e.kind.clone()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn sink_sees_fetch_failure_without_attempt_finished() {
        let (fetch, calls) = scripted(vec![status("STARTED"), Err("x".to_string())]);
        let mut sink = CollectingSink::new();

        let err = Poller::from_millis(5)
            .unwrap()
            .poll_observed(fetch, &mut sink)
            .await
            .unwrap_err();
        assert_eq!(err.fetch_error().map(String::as_str), Some("x"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(
            kinds(&sink),
            vec![
                (0, PollEventKind::SessionStarted { delay_ms: 5 }),
                (1, PollEventKind::AttemptStarted),
                (1, PollEventKind::AttemptFinished { status: "STARTED".to_string() }),
                (2, PollEventKind::AttemptStarted),
                (2, PollEventKind::FetchFailed),
                (2, PollEventKind::Settled { outcome: PollOutcome::Rejected }),
            ]
        );
        assert_eq!(sink.outcome(), Some(PollOutcome::Rejected));
    }

    #[tokio::test(start_paused = true)]
    async fn sink_sees_cancellation_as_settlement() {
        let (fetch, _calls) = scripted(vec![status("STARTED")]);
        let mut sink = CollectingSink::new();

        let err = Poller::from_millis(100)
            .unwrap()
            .poll_until_observed(fetch, tokio::time::sleep(Duration::from_millis(150)), &mut sink)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());

        let events = sink.into_events();
        let last = events.last().expect("events recorded");
        assert_eq!(last.attempt, 1);
        assert_eq!(last.kind, PollEventKind::Settled { outcome: PollOutcome::Cancelled });

        let settled = events
            .iter()
            .filter(|e| matches!(e.kind, PollEventKind::Settled { .. }))
            .count();
        assert_eq!(settled, 1);
    }

    #[test]
    fn with_delay_replaces_the_delay() {
        let poller = Poller::default()
            .with_delay(Duration::from_millis(250))
            .unwrap();
        assert_eq!(poller.delay(), Duration::from_millis(250));
        assert_eq!(poller.delay_ms(), 250);

        assert_eq!(Poller::default().with_delay(Duration::ZERO), Err(InvalidDelay));
    }

    #[test]
    fn huge_delays_saturate_in_milliseconds() {
        let poller = Poller::new(Duration::MAX).unwrap();
        assert_eq!(poller.delay_ms(), u64::MAX);
    }

    #[test]
    fn attempt_counter_saturates() {
        assert_eq!(next_attempt(0), 1);
        assert_eq!(next_attempt(u64::MAX - 1), u64::MAX);
        assert_eq!(next_attempt(u64::MAX), u64::MAX);
    }
}
