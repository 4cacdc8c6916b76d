// Renderer bridge: turns configuration into wire messages and posts them to an injected
// channel. Delivery is best-effort; a detached channel is a silent no-op.

use thiserror::Error;
use tracing::{debug, warn};

use crate::message::{cable_messages, change_messages, full_config_messages, Field, Message};
use crate::store::Change;
use crate::types::{CableAssignment, Configuration};

/// Acknowledgement returned by a channel that accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack;

/// Channel-level delivery failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Renderer rejected message: {0}")]
    Rejected(String),

    #[error("Renderer channel closed")]
    Closed,
}

/// Anything that can carry a wire string to the renderer.
pub trait RendererChannel {
    fn post(&mut self, message: &str) -> Result<Ack, SendError>;
}

impl<C: RendererChannel + ?Sized> RendererChannel for Box<C> {
    fn post(&mut self, message: &str) -> Result<Ack, SendError> {
        (**self).post(message)
    }
}

/// Result of a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Posted(Ack),
    /// No renderer attached yet.
    Skipped,
    Failed(SendError),
}

/// Tally of a multi-message send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub posted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    fn record(&mut self, delivery: &Delivery) {
        match delivery {
            Delivery::Posted(_) => self.posted += 1,
            Delivery::Skipped => self.skipped += 1,
            Delivery::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.posted + self.skipped + self.failed
    }
}

/// Sends configuration updates to the embedded renderer.
pub struct RendererBridge<C> {
    channel: Option<C>,
    recording: Option<Vec<Message>>,
}

impl<C: RendererChannel> RendererBridge<C> {
    /// Bridge with no renderer attached.
    pub fn new() -> Self {
        RendererBridge {
            channel: None,
            recording: None,
        }
    }

    pub fn with_channel(channel: C) -> Self {
        RendererBridge {
            channel: Some(channel),
            recording: None,
        }
    }

    /// Attach the renderer, returning any previously attached channel.
    pub fn attach(&mut self, channel: C) -> Option<C> {
        self.channel.replace(channel)
    }

    pub fn detach(&mut self) -> Option<C> {
        self.channel.take()
    }

    pub fn is_attached(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel(&self) -> Option<&C> {
        self.channel.as_ref()
    }

    /// Capture every subsequent send as a replay log entry.
    pub fn start_recording(&mut self) {
        self.recording = Some(Vec::new());
    }

    /// Stop recording and return what was captured.
    pub fn take_recording(&mut self) -> Vec<Message> {
        self.recording.take().unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Build `<channel>[_<index>]:<value>` and post it.
    pub fn send_to_iframe(&mut self, field: Field, value: &str, index: Option<usize>) -> Delivery {
        self.send(&Message {
            field,
            value: value.to_string(),
            index,
        })
    }

    pub fn send(&mut self, message: &Message) -> Delivery {
        if let Some(recording) = self.recording.as_mut() {
            recording.push(message.clone());
        }

        let Some(channel) = self.channel.as_mut() else {
            return Delivery::Skipped;
        };

        let wire = message.to_string();
        match channel.post(&wire) {
            Ok(ack) => {
                debug!(message = %wire, "posted to renderer");
                Delivery::Posted(ack)
            }
            Err(err) => {
                warn!(message = %wire, error = %err, "renderer send failed");
                Delivery::Failed(err)
            }
        }
    }

    /// Send messages in order. Failures do not stop the remaining sends.
    pub fn send_all<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) -> SyncReport {
        let mut report = SyncReport::default();
        for message in messages {
            let delivery = self.send(message);
            report.record(&delivery);
        }
        report
    }

    /// `system:<type>` first for system bases, then `cable_<index>:<designId>`.
    pub fn send_cable_config(&mut self, index: usize, cable: &CableAssignment) -> SyncReport {
        self.send_all(&cable_messages(index, cable))
    }

    /// Full resync: scalar fields in fixed order, then every cable in position order.
    pub fn send_full_config(&mut self, config: &Configuration) -> SyncReport {
        let report = self.send_all(&full_config_messages(config));
        debug!(
            posted = report.posted,
            skipped = report.skipped,
            failed = report.failed,
            "full config sync"
        );
        report
    }

    /// Send what a store update changed. See [`change_messages`].
    pub fn send_change(&mut self, change: &Change, current: &Configuration) -> SyncReport {
        self.send_all(&change_messages(
            &change.previous,
            current,
            change.cables_regenerated,
        ))
    }
}

impl<C: RendererChannel + Clone> RendererBridge<C> {
    /// Record `messages` and return them with a copy of the channel.
    ///
    /// The outbox posts without touching this bridge, so whatever guards the bridge can be
    /// released first and the renderer may call back into its owner while receiving.
    pub fn hand_off(&mut self, messages: Vec<Message>) -> Outbox<C> {
        if let Some(recording) = self.recording.as_mut() {
            recording.extend(messages.iter().cloned());
        }
        Outbox {
            channel: self.channel.clone(),
            messages,
        }
    }
}

/// Messages already recorded by a bridge, waiting to be posted.
pub struct Outbox<C> {
    channel: Option<C>,
    messages: Vec<Message>,
}

impl<C: RendererChannel> Outbox<C> {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Post every message in order. Skipped when no renderer was attached at hand-off.
    pub fn post(self) -> SyncReport {
        let mut bridge = RendererBridge {
            channel: self.channel,
            recording: None,
        };
        bridge.send_all(&self.messages)
    }
}

impl<C: RendererChannel> Default for RendererBridge<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Channel that keeps every posted message. Used by native tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    pub sent: Vec<String>,
}

impl RendererChannel for MemoryChannel {
    fn post(&mut self, message: &str) -> Result<Ack, SendError> {
        self.sent.push(message.to_string());
        Ok(Ack)
    }
}
