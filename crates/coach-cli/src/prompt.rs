use std::io;

use anyhow::Result;
use cliclack::{input, select, spinner};
use coach::knowledge::StarterTopic;

pub trait Prompt {
    fn get_input(&mut self) -> Result<Input>;
    /// Offer the starter topics; choosing none falls back to free input.
    fn pick_topic(&mut self, topics: &[StarterTopic]) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&self);
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // None for control inputs such as Exit
}

pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

impl Input {
    pub fn message(content: impl Into<String>) -> Self {
        Input {
            input_type: InputType::Message,
            content: Some(content.into()),
        }
    }

    pub fn exit() -> Self {
        Input {
            input_type: InputType::Exit,
            content: None,
        }
    }

    pub fn ask_again() -> Self {
        Input {
            input_type: InputType::AskAgain,
            content: None,
        }
    }
}

/// Classify a line typed by the user.
pub fn parse_input(text: &str) -> Input {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("exit") {
        Input::exit()
    } else if trimmed.is_empty() {
        Input::ask_again()
    } else {
        Input::message(text)
    }
}

pub struct CliclackPrompt {
    spinner: Option<cliclack::ProgressBar>,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt { spinner: None }
    }
}

// cliclack reports Ctrl-C at a prompt as an interrupted read
fn interrupted_is_exit(result: io::Result<Input>) -> Result<Input> {
    match result {
        Ok(input) => Ok(input),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Input::exit()),
        Err(e) => Err(e.into()),
    }
}

impl Prompt for CliclackPrompt {
    fn get_input(&mut self) -> Result<Input> {
        let text = input("You:")
            .placeholder("Ask about training, recovery or fueling")
            .interact::<String>()
            .map(|text| parse_input(&text));
        interrupted_is_exit(text)
    }

    fn pick_topic(&mut self, topics: &[StarterTopic]) -> Result<Input> {
        let mut picker = select("Pick a starter topic").item(None, "Ask my own question", "");
        for topic in topics {
            picker = picker.item(
                Some(topic.prompt),
                format!("{} {}", topic.icon, topic.label),
                "",
            );
        }

        match interrupted_is_exit(picker.interact().map(|choice| match choice {
            Some(prompt) => Input::message(prompt),
            None => Input::ask_again(),
        }))? {
            Input {
                input_type: InputType::AskAgain,
                ..
            } => self.get_input(),
            input => Ok(input),
        }
    }

    fn show_busy(&mut self) {
        let spin = spinner();
        spin.start("awaiting reply");
        self.spinner = Some(spin);
    }

    fn hide_busy(&mut self) {
        if let Some(spin) = self.spinner.take() {
            spin.stop("");
        }
    }

    fn close(&self) {
        let _ = cliclack::outro("See you on the next ride");
    }
}
