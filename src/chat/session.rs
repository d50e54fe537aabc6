//! Chat session state.
//!
//! [`ChatSession`] owns the transcript, the input buffer, and the
//! submission state. It performs no I/O: key presses go in, and a submit
//! hands back the turns to send. Only the UI loop holds a session.

use docqa_core::transcript::{Role, Transcript, Turn};

use crate::error::Reply;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_WAITING: &str = "AI is responding...";

/// A key press, already decoded from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    /// Submit the input.
    Enter,
    /// Insert a literal newline.
    ShiftEnter,
    Char(char),
    Backspace,
}

/// Who a displayed message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Ai,
    You,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Ai => "AI",
            Speaker::You => "You",
        }
    }
}

/// One message as shown on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug)]
pub struct ChatSession {
    transcript: Transcript,
    display: Vec<DisplayEntry>,
    input: String,
    pending: bool,
}

impl ChatSession {
    /// Start a session with an optional system instruction and the
    /// assistant's greeting.
    pub fn new(greeting: &str, system_prompt: Option<&str>) -> Self {
        let mut session = Self {
            transcript: Transcript::new(),
            display: Vec::new(),
            input: String::new(),
            pending: false,
        };
        if let Some(system) = system_prompt {
            session.transcript.push(Turn::system(system));
        }
        session.push(Turn::assistant(greeting));
        session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn display(&self) -> &[DisplayEntry] {
        &self.display
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn send_enabled(&self) -> bool {
        !self.pending
    }

    pub fn status(&self) -> &'static str {
        if self.pending {
            STATUS_WAITING
        } else {
            STATUS_READY
        }
    }

    /// Apply a key press. Returns the turns to send when the key submitted
    /// a message.
    pub fn handle_key(&mut self, key: InputKey) -> Option<Vec<Turn>> {
        match key {
            InputKey::Enter => self.submit(),
            InputKey::ShiftEnter => {
                self.input.push('\n');
                None
            }
            InputKey::Char(c) => {
                self.input.push(c);
                None
            }
            InputKey::Backspace => {
                self.input.pop();
                None
            }
        }
    }

    /// Submit the current input.
    ///
    /// Ignored while a reply is pending and when the input is blank; in
    /// both cases the input is left as it is.
    pub fn submit(&mut self) -> Option<Vec<Turn>> {
        if self.pending {
            tracing::debug!("submit ignored: reply pending");
            return None;
        }
        let message = self.input.trim();
        if message.is_empty() {
            return None;
        }

        let turn = Turn::user(message);
        self.input.clear();
        self.push(turn);
        self.pending = true;
        Some(self.transcript.turns().to_vec())
    }

    /// Apply the worker's result and re-enable submission.
    pub fn apply_reply(&mut self, reply: Reply) {
        if !self.pending {
            tracing::warn!("reply received with no request pending");
        }
        let text = match reply {
            Ok(text) => text,
            Err(e) => format!("An error occurred: {}", e),
        };
        self.push(Turn::assistant(text));
        self.pending = false;
    }

    fn push(&mut self, turn: Turn) {
        let speaker = match turn.role {
            Role::User => Some(Speaker::You),
            Role::Assistant => Some(Speaker::Ai),
            Role::System => None,
        };
        if let Some(speaker) = speaker {
            self.display.push(DisplayEntry {
                speaker,
                text: turn.content.clone(),
            });
        }
        self.transcript.push(turn);
    }
}
