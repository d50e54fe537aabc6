//! Terminal surface for `docqa chat`, drawn with `console`.
//!
//! Screen layout, top to bottom: title bar, transcript (the most recent
//! lines that fit), status line, input area.
//!
//! Terminals report Enter and Shift+Enter identically, so a newline is
//! entered with Alt+Enter (or Shift+Enter where the terminal is set to send
//! `ESC CR` for it). Ctrl+J arrives as Enter and submits. Esc or Ctrl+D
//! quits.

use anyhow::Result;
use console::{style, Key, Term};
use tokio::sync::mpsc::UnboundedSender;

use super::session::{ChatSession, InputKey, Speaker};
use super::{Surface, UiEvent};

const HELP: &str = "Enter send · Alt+Enter newline · Esc quit";

/// Translate a raw key into a UI event. Keys with no meaning map to `None`.
pub fn map_key(key: Key) -> Option<UiEvent> {
    match key {
        Key::Enter => Some(UiEvent::Key(InputKey::Enter)),
        Key::UnknownEscSeq(seq) if seq == ['\r'] || seq == ['\n'] => {
            Some(UiEvent::Key(InputKey::ShiftEnter))
        }
        Key::Backspace => Some(UiEvent::Key(InputKey::Backspace)),
        Key::Escape | Key::Char('\u{4}') | Key::Char('\u{3}') => Some(UiEvent::Quit),
        Key::Char(c) if !c.is_control() => Some(UiEvent::Key(InputKey::Char(c))),
        _ => None,
    }
}

/// Read keys on a dedicated thread and forward them to the UI loop.
pub fn spawn_key_reader(tx: UnboundedSender<UiEvent>) {
    std::thread::spawn(move || {
        let term = Term::stdout();
        loop {
            match term.read_key() {
                Ok(key) => {
                    if let Some(event) = map_key(key) {
                        let quit = matches!(event, UiEvent::Quit);
                        if tx.send(event).is_err() || quit {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("cannot read keyboard input: {}", e);
                    let _ = tx.send(UiEvent::Quit);
                    break;
                }
            }
        }
    });
}

pub struct TerminalSurface {
    term: Term,
    title: String,
}

impl TerminalSurface {
    pub fn new(model: &str) -> Self {
        Self {
            term: Term::stdout(),
            title: format!("docqa chat ({})", model),
        }
    }

    /// Put the terminal back the way it was.
    pub fn restore(&self) {
        let _ = self.term.show_cursor();
        let _ = self.term.write_line("");
    }
}

impl Surface for TerminalSurface {
    fn render(&mut self, session: &ChatSession) -> Result<()> {
        let (rows, cols) = self.term.size();
        let screen = layout(session, &self.title, rows as usize, cols as usize);

        self.term.hide_cursor()?;
        self.term.clear_screen()?;
        self.term.write_str(&screen.join("\n"))?;
        self.term.show_cursor()?;
        self.term.flush()?;
        Ok(())
    }
}

/// Compose the full screen as lines.
fn layout(session: &ChatSession, title: &str, rows: usize, cols: usize) -> Vec<String> {
    let width = cols.max(20);
    let rule = "─".repeat(width);

    let mut input_lines: Vec<String> = Vec::new();
    for (i, line) in session.input().split('\n').enumerate() {
        let prefix = if i == 0 { "> " } else { "  " };
        for (j, piece) in wrap(line, width - 2).into_iter().enumerate() {
            let p = if j == 0 { prefix } else { "  " };
            input_lines.push(format!("{}{}", p, piece));
        }
    }

    let status = if session.send_enabled() {
        format!("{}  {}", style(session.status()).green(), style(HELP).dim())
    } else {
        format!(
            "{}  {}",
            style(session.status()).yellow(),
            style("[send disabled]").dim()
        )
    };

    let header = vec![style(format!(" {} ", title)).bold().reverse().to_string(), rule.clone()];
    let mut footer = vec![rule, status];
    footer.extend(input_lines);

    let mut body: Vec<String> = Vec::new();
    for entry in session.display() {
        let label = format!("{}: ", entry.speaker.label());
        let styled_label = match entry.speaker {
            Speaker::Ai => style(label.clone()).green().bold().to_string(),
            Speaker::You => style(label.clone()).blue().bold().to_string(),
        };
        let indent = " ".repeat(label.chars().count());
        let mut first = true;
        for line in entry.text.split('\n') {
            for piece in wrap(line, width - label.chars().count()) {
                if first {
                    body.push(format!("{}{}", styled_label, piece));
                    first = false;
                } else {
                    body.push(format!("{}{}", indent, piece));
                }
            }
        }
        body.push(String::new());
    }

    let available = rows.saturating_sub(header.len() + footer.len());
    let skip = body.len().saturating_sub(available);

    let mut screen = header;
    screen.extend(body.into_iter().skip(skip));
    screen.extend(footer);
    screen
}

/// Break `line` into pieces of at most `width` chars, preferring spaces.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= width {
        return vec![line.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while chars.len() - start > width {
        let window = &chars[start..start + width];
        let cut = match window.iter().rposition(|c| *c == ' ') {
            Some(pos) if pos > 0 => pos,
            _ => width,
        };
        pieces.push(chars[start..start + cut].iter().collect());
        start += cut;
        while start < chars.len() && chars[start] == ' ' {
            start += 1;
        }
    }
    if start < chars.len() {
        pieces.push(chars[start..].iter().collect());
    }
    pieces
}
