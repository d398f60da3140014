use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of trailing messages included in the model context.
const CONTEXT_WINDOW: usize = 4;

/// Direction of a chat message relative to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One bubble in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub direction: Direction,
}

/// Append-only conversation history shared between the text panel and the
/// avatar panel.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>, direction: Direction) -> &ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            text: text.into(),
            direction,
        });
        self.messages.last().expect("message was just pushed")
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Formats the trailing context window for the chat endpoint: one
    /// `User:`/`Assistant:` line per message, newest last.
    pub fn context(&self) -> String {
        let start = self.messages.len().saturating_sub(CONTEXT_WINDOW);
        self.messages[start..]
            .iter()
            .map(|message| {
                let speaker = match message.direction {
                    Direction::Outgoing => "User",
                    Direction::Incoming => "Assistant",
                };
                format!("{speaker}: {}", message.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Status line shown under the avatar. The variants are mutually exclusive
/// and recomputed from the current flags every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantStatus {
    Listening,
    Thinking,
    Speaking,
    HoldToTalk,
}

impl AssistantStatus {
    /// Precedence: listening wins over thinking, thinking over speaking, and
    /// the prompt shows only when nothing else is happening.
    pub fn from_flags(listening: bool, thinking: bool, speaking: bool) -> Self {
        if listening {
            Self::Listening
        } else if thinking {
            Self::Thinking
        } else if speaking {
            Self::Speaking
        } else {
            Self::HoldToTalk
        }
    }
}

impl fmt::Display for AssistantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Listening => "Listening…",
            Self::Thinking => "Thinking…",
            Self::Speaking => "Speaking…",
            Self::HoldToTalk => "Hold to talk",
        };
        f.write_str(label)
    }
}
