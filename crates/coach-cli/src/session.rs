use std::io::Write;

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;

use crate::prompt::{InputType, Prompt};

use coach::client::{ChatSession, ChatSnapshot, RelayTransport, SendOutcome};
use coach::knowledge::STARTER_TOPICS;

/// Tracks what has been written for the streaming reply so each update prints only
/// the new suffix. A reply that stops extending the printed text (the fallback
/// replacing a partial answer) is printed again in full on a fresh line.
#[derive(Default)]
struct ReplyPrinter {
    shown: String,
}

impl ReplyPrinter {
    fn advance(&mut self, reply: &str) -> Option<String> {
        if reply == self.shown {
            return None;
        }
        let output = match reply.strip_prefix(self.shown.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{}", reply),
        };
        self.shown = reply.to_string();
        Some(output)
    }
}

fn latest_reply(snapshot: &ChatSnapshot) -> Option<&str> {
    snapshot
        .messages
        .last()
        .filter(|message| message.is_assistant())
        .map(|message| message.content.as_str())
}

pub struct Session<'a, T> {
    chat: ChatSession<T>,
    prompt: Box<dyn Prompt + 'a>,
    out: Box<dyn Write + 'a>,
    offer_topics: bool,
}

impl<'a, T: RelayTransport> Session<'a, T> {
    pub fn new(
        chat: ChatSession<T>,
        prompt: Box<dyn Prompt + 'a>,
        out: Box<dyn Write + 'a>,
        offer_topics: bool,
    ) -> Self {
        Session {
            chat,
            prompt,
            out,
            offer_topics,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        loop {
            let input = if self.offer_topics && self.chat.snapshot().messages.is_empty() {
                self.prompt.pick_topic(STARTER_TOPICS)?
            } else {
                self.prompt.get_input()?
            };

            match input.input_type {
                InputType::Exit => break,
                InputType::AskAgain => continue,
                InputType::Message => {
                    if let Some(content) = &input.content {
                        self.ask(content).await?;
                    }
                }
            }
        }
        self.prompt.close();
        Ok(())
    }

    /// Send one message and print the reply as it streams. Ctrl-C stops the stream
    /// and keeps whatever arrived.
    pub async fn ask(&mut self, text: &str) -> Result<SendOutcome> {
        let mut updates = self.chat.subscribe();
        let cancel = CancellationToken::new();
        let mut printer = ReplyPrinter::default();
        let mut busy = true;

        self.prompt.show_busy();
        let send = self.chat.send_with_cancel(text, cancel.clone());
        tokio::pin!(send);

        let outcome = loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                Ok(()) = updates.changed() => {
                    let snapshot = updates.borrow_and_update().clone();
                    if let Some(output) = latest_reply(&snapshot).and_then(|r| printer.advance(r)) {
                        if busy {
                            self.prompt.hide_busy();
                            busy = false;
                        }
                        write!(self.out, "{}", output)?;
                        self.out.flush()?;
                    }
                }
                _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                    tracing::debug!("cancelling reply");
                    cancel.cancel();
                }
            }
        };

        if busy {
            self.prompt.hide_busy();
        }
        // The last update can land together with completion
        if let Some(output) = latest_reply(&self.chat.snapshot()).and_then(|r| printer.advance(r))
        {
            write!(self.out, "{}", output)?;
        }

        match outcome {
            SendOutcome::Cancelled => writeln!(self.out, "\n{}", style("(stopped)").dim())?,
            SendOutcome::Ignored(reason) => {
                tracing::debug!(?reason, "message not sent");
            }
            SendOutcome::Completed | SendOutcome::Failed => writeln!(self.out)?,
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(outcome)
    }
}
