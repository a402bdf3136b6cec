// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress reporting for a single extraction request.
//
// Fire-and-forget: reporting never blocks and never fails the request. The
// channel form yields a finite stream that ends when the request finishes.

use std::sync::Arc;

use lesewerk_core::{ExtractionState, ProgressEvent};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

type Callback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Clone, Default)]
enum Sink {
    #[default]
    Silent,
    Callback(Callback),
    Channel(UnboundedSender<ProgressEvent>),
}

/// Where progress events for one request go.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Sink,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.sink {
            Sink::Silent => "silent",
            Sink::Callback(_) => "callback",
            Sink::Channel(_) => "channel",
        };
        f.debug_struct("ProgressReporter").field("sink", &kind).finish()
    }
}

impl ProgressReporter {
    /// Discard all events.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Invoke `callback` synchronously for every event.
    pub fn from_fn(callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            sink: Sink::Callback(Arc::new(callback)),
        }
    }

    /// A reporter paired with the stream of its events.
    ///
    /// The stream ends once every clone of the reporter is dropped, which
    /// happens when the request that owns it completes.
    pub fn channel() -> (Self, ProgressStream) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                sink: Sink::Channel(tx),
            },
            ProgressStream { rx },
        )
    }

    pub fn report(&self, state: ExtractionState, label: &str, percent: u8) {
        let event = ProgressEvent {
            state,
            label: label.to_string(),
            percent: percent.min(100),
        };
        match &self.sink {
            Sink::Silent => {}
            Sink::Callback(callback) => callback(&event),
            // A dropped receiver only means nobody is listening.
            Sink::Channel(tx) => {
                let _ = tx.send(event);
            }
        }
    }
}

/// One-shot stream of progress events for a single request.
#[derive(Debug)]
pub struct ProgressStream {
    rx: UnboundedReceiver<ProgressEvent>,
}

impl ProgressStream {
    /// Next event, or `None` once the request has finished.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn channel_stream_ends_when_reporter_dropped() {
        let (reporter, mut stream) = ProgressReporter::channel();
        reporter.report(ExtractionState::FastAttempt, "rendering", 10);
        reporter.report(ExtractionState::FastAttempt, "processing", 250);
        drop(reporter);

        let first = stream.next().await.unwrap();
        assert_eq!(first.label, "rendering");
        let second = stream.next().await.unwrap();
        assert_eq!(second.percent, 100);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn callback_receives_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::from_fn(move |event| {
            sink.lock().unwrap().push(event.label.clone());
        });
        reporter.report(ExtractionState::Preprocessing, "a", 1);
        reporter.report(ExtractionState::FastAttempt, "b", 2);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn reporting_after_receiver_dropped_is_harmless() {
        let (reporter, stream) = ProgressReporter::channel();
        drop(stream);
        reporter.report(ExtractionState::Done, "done", 100);
    }
}
