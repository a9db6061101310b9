//! Session data model — messages, cards, suggestions, and session events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{Scheme, WeatherSnapshot};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
        }
    }
}

/// Which entity a dropdown card selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropdownField {
    Scheme,
    Crop,
    Disease,
}

/// Extra context carried by a dropdown (the crop a disease list belongs to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownContext {
    pub crop: String,
}

/// Structured, non-text attachment on a bot message. One variant per card
/// kind, dispatched exhaustively in the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Card {
    Weather {
        data: WeatherSnapshot,
    },
    Scheme {
        data: Scheme,
    },
    CropGrid {
        data: Vec<String>,
    },
    Dropdown {
        data: Vec<String>,
        field: DropdownField,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<DropdownContext>,
    },
}

/// Navigation targets a suggestion chip can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowAction {
    Weather,
    Schemes,
    PlantProtection,
    SelectCrop,
    Home,
    Organic,
}

impl std::fmt::Display for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weather => write!(f, "weather"),
            Self::Schemes => write!(f, "schemes"),
            Self::PlantProtection => write!(f, "plant-protection"),
            Self::SelectCrop => write!(f, "select-crop"),
            Self::Home => write!(f, "home"),
            Self::Organic => write!(f, "organic"),
        }
    }
}

impl std::str::FromStr for FlowAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weather" => Ok(Self::Weather),
            "schemes" => Ok(Self::Schemes),
            "plant-protection" => Ok(Self::PlantProtection),
            "select-crop" => Ok(Self::SelectCrop),
            "home" => Ok(Self::Home),
            "organic" => Ok(Self::Organic),
            _ => Err(format!("Unknown flow action: {}", s)),
        }
    }
}

impl FlowAction {
    /// Label used for the synthetic user message a chip click produces
    /// ("plant-protection" → "Plant Protection").
    pub fn label(&self) -> String {
        self.to_string()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A suggestion chip attached to a bot message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub icon: String,
    #[serde(rename = "text")]
    pub label: String,
    pub action: FlowAction,
}

impl Suggestion {
    pub fn new(icon: &str, label: &str, action: FlowAction) -> Self {
        Self {
            icon: icon.to_string(),
            label: label.to_string(),
            action,
        }
    }
}

/// One chat message. Append-only: once stored it is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

impl Message {
    fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            quick_replies: Vec::new(),
            card: None,
            suggestions: Vec::new(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    /// Create a bot message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }

    /// Attach quick-reply chips.
    pub fn with_quick_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quick_replies = replies.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a card.
    pub fn with_card(mut self, card: Card) -> Self {
        self.card = Some(card);
        self
    }

    /// Attach suggestion chips.
    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

/// Session change events, broadcast to every embedding surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message was appended.
    MessageAdded { message: Message },
    /// The typing indicator changed.
    Typing { active: bool },
    /// The session was cleared.
    SessionCleared,
    /// Full session sync (sent to WS clients on connect and after lag).
    SessionSync { messages: Vec<Message> },
}
