//! Interactive chat.
//!
//! ```text
//!  key reader thread ──┐
//!                      ├─▶ mpsc<UiEvent> ─▶ UI loop (owns ChatSession) ─▶ Surface
//!  worker task ────────┘                         │
//!        ▲                                       │ submit
//!        └──────── ChatModel::complete ◀─────────┘
//! ```
//!
//! The UI loop is the only owner of the [`ChatSession`]. Key presses and
//! model replies reach it over one channel and are applied one at a time in
//! arrival order. Each submit spawns one worker task; the session refuses
//! further submits until that worker's reply has been applied.

pub mod session;
pub mod terminal;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use docqa_core::llm::ChatModel;
use docqa_core::transcript::Turn;

use crate::config::Config;
use crate::error::{into_pipeline_error, Reply};
use crate::llm::create_chat_model;

pub use session::{ChatSession, DisplayEntry, InputKey, Speaker};

/// Everything the UI loop reacts to.
#[derive(Debug)]
pub enum UiEvent {
    Key(InputKey),
    Reply(Reply),
    Quit,
}

/// Where the session is drawn.
pub trait Surface {
    fn render(&mut self, session: &ChatSession) -> Result<()>;
}

/// Run `docqa chat` in the current terminal.
pub async fn run_chat(config: &Config) -> Result<()> {
    let model = create_chat_model(&config.chat.model_config())?;
    let mut session =
        ChatSession::new(&config.chat.greeting, config.chat.system_prompt.as_deref());

    let (tx, mut rx) = mpsc::unbounded_channel();
    terminal::spawn_key_reader(tx.clone());
    let mut surface = terminal::TerminalSurface::new(model.model_name());

    let result = run_chat_loop(&mut session, model, tx, &mut rx, &mut surface).await;
    surface.restore();
    result
}

/// Drive `session` until a [`UiEvent::Quit`] arrives or every sender is
/// gone.
pub async fn run_chat_loop<S: Surface>(
    session: &mut ChatSession,
    model: Arc<dyn ChatModel>,
    tx: UnboundedSender<UiEvent>,
    rx: &mut UnboundedReceiver<UiEvent>,
    surface: &mut S,
) -> Result<()> {
    surface.render(session)?;
    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::Key(key) => {
                if let Some(turns) = session.handle_key(key) {
                    spawn_worker(model.clone(), turns, tx.clone());
                }
            }
            UiEvent::Reply(reply) => session.apply_reply(reply),
            UiEvent::Quit => break,
        }
        surface.render(session)?;
    }
    Ok(())
}

fn spawn_worker(model: Arc<dyn ChatModel>, turns: Vec<Turn>, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        tracing::debug!(turns = turns.len(), model = model.model_name(), "requesting reply");
        let reply = model
            .complete(&turns)
            .await
            .map_err(|e| into_pipeline_error(e, model.model_name()));
        if tx.send(UiEvent::Reply(reply)).is_err() {
            tracing::debug!("chat closed before reply arrived");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Frame {
        turns: usize,
        send_enabled: bool,
        input: String,
    }

    /// Records frames and quits once the transcript reaches `quit_at` turns.
    struct RecordingSurface {
        frames: Vec<Frame>,
        quit_at: usize,
        tx: UnboundedSender<UiEvent>,
    }

    impl Surface for RecordingSurface {
        fn render(&mut self, session: &ChatSession) -> Result<()> {
            self.frames.push(Frame {
                turns: session.transcript().len(),
                send_enabled: session.send_enabled(),
                input: session.input().to_string(),
            });
            if session.transcript().len() >= self.quit_at {
                let _ = self.tx.send(UiEvent::Quit);
            }
            Ok(())
        }
    }

    struct CountingModel {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, turns: &[Turn]) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PipelineError::remote("Gemini", "HTTP 503").into());
            }
            let last = turns.last().map(|t| t.content.as_str()).unwrap_or("");
            Ok(format!("reply to {}", last))
        }
    }

    fn keys(tx: &UnboundedSender<UiEvent>, text: &str) {
        for c in text.chars() {
            tx.send(UiEvent::Key(InputKey::Char(c))).unwrap();
        }
    }

    async fn run(
        model: Arc<CountingModel>,
        script: impl FnOnce(&UnboundedSender<UiEvent>),
    ) -> (ChatSession, Vec<Frame>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        script(&tx);
        let mut session = ChatSession::new("Hello!", None);
        let mut surface = RecordingSurface {
            frames: Vec::new(),
            quit_at: 3,
            tx: tx.clone(),
        };
        run_chat_loop(&mut session, model, tx, &mut rx, &mut surface)
            .await
            .unwrap();
        (session, surface.frames)
    }

    #[tokio::test]
    async fn test_one_call_in_flight_and_reenabled_once() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (session, frames) = run(model.clone(), |tx| {
            keys(tx, "Hi");
            tx.send(UiEvent::Key(InputKey::Enter)).unwrap();
            // Queued behind the first submit, so they land while it is pending
            keys(tx, "x");
            tx.send(UiEvent::Key(InputKey::Enter)).unwrap();
        })
        .await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(
            session.transcript().last(),
            Some(&Turn::assistant("reply to Hi"))
        );
        assert_eq!(session.input(), "x");

        let reenabled = frames
            .windows(2)
            .filter(|w| !w[0].send_enabled && w[1].send_enabled)
            .count();
        assert_eq!(reenabled, 1);
        assert!(frames.iter().any(|f| f.turns == 2 && !f.send_enabled));
        assert!(frames.last().unwrap().send_enabled);
    }

    #[tokio::test]
    async fn test_blank_submit_triggers_no_call() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (session, _) = run(model.clone(), |tx| {
            keys(tx, "   ");
            tx.send(UiEvent::Key(InputKey::Enter)).unwrap();
            tx.send(UiEvent::Quit).unwrap();
        })
        .await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_call_becomes_assistant_message() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let (session, _) = run(model, |tx| {
            keys(tx, "Hi");
            tx.send(UiEvent::Key(InputKey::Enter)).unwrap();
        })
        .await;

        let last = session.display().last().unwrap();
        assert_eq!(last.speaker, Speaker::Ai);
        assert!(last.text.starts_with("An error occurred: "));
        assert!(last.text.contains("HTTP 503"));
        assert!(session.send_enabled());
    }
}
