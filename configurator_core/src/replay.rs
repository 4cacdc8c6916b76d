// Replay of a recorded message sequence with fixed pacing.
// One replay at a time per engine; a second request is rejected, not queued.
// Single-threaded: the engine and its futures live on the page's event loop.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfiguratorError, Result};
use crate::message::Message;

/// Pause after every replayed message. Approximates the renderer's settle time.
pub const REPLAY_INTERVAL: Duration = Duration::from_millis(100);

/// Replay log grammar version written by this build.
pub const REPLAY_LOG_VERSION: u32 = 1;

/// Persisted, ordered list of bridge calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub version: u32,
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLog {
    Versioned { version: u32, messages: Vec<Message> },
    // Logs saved before versioning were a bare array of calls.
    Legacy(Vec<Message>),
}

impl ReplayLog {
    pub fn new(messages: Vec<Message>) -> Self {
        ReplayLog {
            version: REPLAY_LOG_VERSION,
            messages,
        }
    }

    /// Parse a versioned log object or a legacy bare array.
    pub fn from_json(json: &str) -> Result<Self> {
        let log = match serde_json::from_str::<StoredLog>(json)? {
            StoredLog::Versioned { version, messages } => ReplayLog { version, messages },
            StoredLog::Legacy(messages) => ReplayLog::new(messages),
        };
        if log.version > REPLAY_LOG_VERSION {
            return Err(ConfiguratorError::UnsupportedLogVersion {
                found: log.version,
                supported: REPLAY_LOG_VERSION,
            });
        }
        Ok(log)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Suspends the replay between messages.
pub trait Pacer {
    fn pause(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// How a replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub sent: usize,
    pub cancelled: bool,
}

/// Requests that the running replay stop before its next message.
#[derive(Debug, Clone)]
pub struct ReplayCanceller {
    cancelled: Rc<Cell<bool>>,
}

impl ReplayCanceller {
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }
}

// Clears the running flag however the replay future ends, including being dropped.
struct RunGuard {
    running: Rc<Cell<bool>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.set(false);
    }
}

/// Re-drives a message sink from a recorded log.
#[derive(Debug, Clone)]
pub struct ReplayEngine<P> {
    pacer: P,
    running: Rc<Cell<bool>>,
    cancelled: Rc<Cell<bool>>,
}

impl<P: Pacer + Clone> ReplayEngine<P> {
    pub fn new(pacer: P) -> Self {
        ReplayEngine {
            pacer,
            running: Rc::new(Cell::new(false)),
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    pub fn canceller(&self) -> ReplayCanceller {
        ReplayCanceller {
            cancelled: Rc::clone(&self.cancelled),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Start replaying `messages` into `deliver`, pausing [`REPLAY_INTERVAL`] after each.
    ///
    /// The engine is claimed immediately, so a second call fails with
    /// [`ConfiguratorError::ReplayInProgress`] until the returned future finishes or is dropped.
    /// The future resolves once every message was handed to `deliver` or the replay was
    /// cancelled; it says nothing about whether the renderer applied them.
    pub fn replay<F>(
        &self,
        messages: Vec<Message>,
        mut deliver: F,
    ) -> Result<impl Future<Output = ReplayOutcome>>
    where
        F: FnMut(&Message),
    {
        if self.running.replace(true) {
            return Err(ConfiguratorError::ReplayInProgress);
        }
        self.cancelled.set(false);

        let guard = RunGuard {
            running: Rc::clone(&self.running),
        };
        let cancelled = Rc::clone(&self.cancelled);
        let pacer = self.pacer.clone();

        Ok(async move {
            let _guard = guard;
            let total = messages.len();
            info!(total, "replay started");

            let mut sent = 0;
            for message in &messages {
                if cancelled.get() {
                    info!(sent, total, "replay cancelled");
                    return ReplayOutcome {
                        sent,
                        cancelled: true,
                    };
                }
                deliver(message);
                sent += 1;
                pacer.pause(REPLAY_INTERVAL).await;
            }

            info!(sent, "replay finished");
            ReplayOutcome {
                sent,
                cancelled: false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Field;
    use futures::executor::block_on;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Sent(String),
        Paused(Duration),
    }

    #[derive(Clone, Default)]
    struct RecordingPacer {
        events: Rc<RefCell<Vec<Event>>>,
    }

    impl Pacer for RecordingPacer {
        fn pause(&self, duration: Duration) -> impl Future<Output = ()> {
            self.events.borrow_mut().push(Event::Paused(duration));
            std::future::ready(())
        }
    }

    fn sample_log() -> Vec<Message> {
        vec![
            Message::new(Field::LightType, "ceiling"),
            Message::new(Field::LightAmount, "2"),
            Message::cable(0, "product_4"),
            Message::system("Nexus"),
            Message::cable(1, "system_base_1"),
        ]
    }

    #[test]
    fn replays_in_order_with_pause_after_each() {
        let pacer = RecordingPacer::default();
        let events = Rc::clone(&pacer.events);
        let engine = ReplayEngine::new(pacer);

        let sink = Rc::clone(&events);
        let replay = engine
            .replay(sample_log(), move |m| {
                sink.borrow_mut().push(Event::Sent(m.to_string()))
            })
            .unwrap();
        let outcome = block_on(replay);

        assert_eq!(outcome, ReplayOutcome { sent: 5, cancelled: false });
        let events = events.borrow();
        assert_eq!(events.len(), 10);
        for (pair, expected) in events.chunks(2).zip(sample_log()) {
            assert_eq!(pair[0], Event::Sent(expected.to_string()));
            assert_eq!(pair[1], Event::Paused(REPLAY_INTERVAL));
        }
    }

    #[test]
    fn second_replay_is_rejected_while_running() {
        let engine = ReplayEngine::new(RecordingPacer::default());
        let first = engine.replay(sample_log(), |_| {}).unwrap();
        assert!(engine.is_running());

        assert_eq!(
            engine.replay(sample_log(), |_| {}).err(),
            Some(ConfiguratorError::ReplayInProgress)
        );

        block_on(first);
        assert!(!engine.is_running());
        assert!(engine.replay(Vec::new(), |_| {}).is_ok());
    }

    #[test]
    fn dropping_the_replay_releases_the_engine() {
        let engine = ReplayEngine::new(RecordingPacer::default());
        let pending = engine.replay(sample_log(), |_| {}).unwrap();
        drop(pending);
        assert!(!engine.is_running());
    }

    #[test]
    fn cancel_stops_before_next_message() {
        let engine = ReplayEngine::new(RecordingPacer::default());
        let canceller = engine.canceller();
        let mut delivered = Vec::new();

        let replay = engine
            .replay(sample_log(), |m| {
                delivered.push(m.clone());
                if delivered.len() == 2 {
                    canceller.cancel();
                }
            })
            .unwrap();
        let outcome = block_on(replay);

        assert_eq!(outcome, ReplayOutcome { sent: 2, cancelled: true });
        assert_eq!(delivered.len(), 2);
    }

    #[test]
    fn stale_cancel_does_not_abort_next_replay() {
        let engine = ReplayEngine::new(RecordingPacer::default());
        engine.canceller().cancel();
        let outcome = block_on(engine.replay(sample_log(), |_| {}).unwrap());
        assert!(!outcome.cancelled);
        assert_eq!(outcome.sent, 5);
    }

    #[test]
    fn log_json_is_versioned() {
        let log = ReplayLog::new(vec![Message::cable(0, "product_4")]);
        let json = log.to_json().unwrap();
        assert_eq!(json, r#"{"version":1,"messages":[["cable","product_4",0]]}"#);
        assert_eq!(ReplayLog::from_json(&json).unwrap(), log);
    }

    #[test]
    fn legacy_array_log_is_accepted() {
        let log = ReplayLog::from_json(r#"[["light_type","wall"],["cable","product_4",0]]"#)
            .unwrap();
        assert_eq!(log.version, REPLAY_LOG_VERSION);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn newer_log_version_is_rejected() {
        let result = ReplayLog::from_json(r#"{"version":7,"messages":[]}"#);
        assert_eq!(
            result,
            Err(ConfiguratorError::UnsupportedLogVersion { found: 7, supported: 1 })
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn message_strategy() -> impl Strategy<Value = Message> {
            prop_oneof![
                "[a-z0-9]{1,6}".prop_map(|v| Message::new(Field::BaseColor, v)),
                (0usize..8, "product_[0-5]").prop_map(|(i, id)| Message::cable(i, id)),
                prop::sample::select(vec!["Prism", "Nexus", "Halo"]).prop_map(Message::system),
            ]
        }

        proptest! {
            /// Property: Replay Fidelity
            /// A replay issues exactly one send per recorded message, in recorded
            /// order, with a full interval pause after each.
            #[test]
            fn replay_preserves_count_and_order(
                messages in prop::collection::vec(message_strategy(), 0..20)
            ) {
                let pacer = RecordingPacer::default();
                let events = Rc::clone(&pacer.events);
                let engine = ReplayEngine::new(pacer);
                let mut delivered = Vec::new();

                let outcome = block_on(
                    engine.replay(messages.clone(), |m| delivered.push(m.clone())).unwrap(),
                );

                prop_assert_eq!(outcome.sent, messages.len());
                prop_assert_eq!(&delivered, &messages);
                let pauses: Vec<Duration> = events
                    .borrow()
                    .iter()
                    .filter_map(|e| match e {
                        Event::Paused(d) => Some(*d),
                        Event::Sent(_) => None,
                    })
                    .collect();
                prop_assert_eq!(pauses.len(), messages.len());
                prop_assert!(pauses.iter().all(|d| *d >= REPLAY_INTERVAL));
            }
        }
    }
}
