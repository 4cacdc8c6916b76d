// Renderer wire grammar: `field ":" value` or `field "_" index ":" value`.
// Encoding is pure; delivery lives in the bridge.

use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ConfiguratorError;
use crate::types::{CableAssignment, Configuration};

/// Message channel understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    LightType,
    LightAmount,
    BaseType,
    BaseColor,
    CableColor,
    CableLength,
    System,
    Cable,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::LightType,
        Field::LightAmount,
        Field::BaseType,
        Field::BaseColor,
        Field::CableColor,
        Field::CableLength,
        Field::System,
        Field::Cable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::LightType => "light_type",
            Field::LightAmount => "light_amount",
            Field::BaseType => "base_type",
            Field::BaseColor => "base_color",
            Field::CableColor => "cable_color",
            Field::CableLength => "cable_length",
            Field::System => "system",
            Field::Cable => "cable",
        }
    }

    fn from_wire(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One renderer message. Also the `[channel, value, index?]` entry of a replay log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub field: Field,
    pub value: String,
    pub index: Option<usize>,
}

impl Message {
    pub fn new(field: Field, value: impl Into<String>) -> Self {
        Message {
            field,
            value: value.into(),
            index: None,
        }
    }

    pub fn indexed(field: Field, value: impl Into<String>, index: usize) -> Self {
        Message {
            field,
            value: value.into(),
            index: Some(index),
        }
    }

    /// `cable_<index>:<design_id>`
    pub fn cable(index: usize, design_id: impl Into<String>) -> Self {
        Message::indexed(Field::Cable, design_id, index)
    }

    /// `system:<system_type>`
    pub fn system(system_type: impl Into<String>) -> Self {
        Message::new(Field::System, system_type)
    }

    /// Channel name as sent, including the index suffix.
    pub fn channel(&self) -> String {
        match self.index {
            Some(index) => format!("{}_{}", self.field, index),
            None => self.field.as_str().to_string(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}_{}:{}", self.field, index, self.value),
            None => write!(f, "{}:{}", self.field, self.value),
        }
    }
}

impl FromStr for Message {
    type Err = ConfiguratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (channel, value) = s
            .split_once(':')
            .ok_or_else(|| ConfiguratorError::InvalidMessage(format!("missing ':' in '{}'", s)))?;

        // Exact names first so `cable_color` never reads as an indexed `cable`.
        if let Some(field) = Field::from_wire(channel) {
            return Ok(Message::new(field, value));
        }

        let (name, suffix) = channel.rsplit_once('_').ok_or_else(|| {
            ConfiguratorError::InvalidMessage(format!("unknown channel '{}'", channel))
        })?;
        let field = Field::from_wire(name).ok_or_else(|| {
            ConfiguratorError::InvalidMessage(format!("unknown channel '{}'", channel))
        })?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfiguratorError::InvalidMessage(format!(
                "bad index in channel '{}'",
                channel
            )));
        }
        let index = suffix.parse::<usize>().map_err(|e| {
            ConfiguratorError::InvalidMessage(format!("bad index in channel '{}': {}", channel, e))
        })?;
        Ok(Message::indexed(field, value, index))
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.index.is_some() { 3 } else { 2 };
        let mut tuple = serializer.serialize_tuple(len)?;
        tuple.serialize_element(&self.field)?;
        tuple.serialize_element(&self.value)?;
        if let Some(index) = self.index {
            tuple.serialize_element(&index)?;
        }
        tuple.end()
    }
}

// Logs captured from the page may carry numbers (e.g. `light_amount`) as JSON numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl From<RawValue> for String {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Text(text) => text,
            RawValue::Number(number) => number.to_string(),
            RawValue::Flag(flag) => flag.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCall {
    Indexed(Field, RawValue, Option<usize>),
    Plain(Field, RawValue),
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawCall::deserialize(deserializer)? {
            RawCall::Indexed(field, value, index) => Message {
                field,
                value: value.into(),
                index,
            },
            RawCall::Plain(field, value) => Message::new(field, value),
        })
    }
}

/// Scalar fields in sync order. The renderer needs topology before any cable detail.
pub fn scalar_messages(config: &Configuration) -> Vec<Message> {
    vec![
        Message::new(Field::LightType, config.light_type.as_str()),
        Message::new(Field::LightAmount, config.light_amount.to_string()),
        Message::new(Field::BaseType, config.base_type.as_str()),
        Message::new(Field::BaseColor, config.base_color.as_str()),
        Message::new(Field::CableColor, config.cable_color.as_str()),
        Message::new(Field::CableLength, config.cable_length.as_str()),
    ]
}

/// Messages for one cable slot. A system base selects its topology before the design,
/// since the renderer resolves the design id inside the current system.
pub fn cable_messages(index: usize, cable: &CableAssignment) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if cable.is_system {
        if let Some(system_type) = &cable.system_type {
            messages.push(Message::system(system_type.as_str()));
        }
    }
    messages.push(Message::cable(index, cable.design_id.as_str()));
    messages
}

/// Full resync: scalars in order, then every cable in position order.
pub fn full_config_messages(config: &Configuration) -> Vec<Message> {
    let mut messages = scalar_messages(config);
    for (index, cable) in config.cables.iter().enumerate() {
        messages.extend(cable_messages(index, cable));
    }
    messages
}

/// Scalar messages whose value differs between two configurations, in sync order.
pub fn changed_scalar_messages(before: &Configuration, after: &Configuration) -> Vec<Message> {
    scalar_messages(before)
        .into_iter()
        .zip(scalar_messages(after))
        .filter(|(old, new)| old != new)
        .map(|(_, new)| new)
        .collect()
}

/// What a store update has to tell the renderer: each changed scalar in sync order, then
/// every cable when the list was regenerated, otherwise only positions that differ.
pub fn change_messages(
    previous: &Configuration,
    current: &Configuration,
    cables_regenerated: bool,
) -> Vec<Message> {
    let mut messages = changed_scalar_messages(previous, current);
    for (index, cable) in current.cables.iter().enumerate() {
        if cables_regenerated || previous.cables.get(index) != Some(cable) {
            messages.extend(cable_messages(index, cable));
        }
    }
    messages
}

/// Signals the renderer sends back to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundSignal {
    /// `app:ready`, the renderer finished initializing.
    Ready,
}

impl InboundSignal {
    pub fn parse(message: &str) -> Option<InboundSignal> {
        match message.trim() {
            "app:ready" => Some(InboundSignal::Ready),
            _ => None,
        }
    }
}
