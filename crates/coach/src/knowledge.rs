//! Static domain data: the system instruction sent with every relay and the
//! starter topics offered before the first message.
use serde::Serialize;
use std::path::Path;

use crate::prompt_template::{load_prompt, load_prompt_file, PromptError};

pub const DEFAULT_ASSISTANT_NAME: &str = "AthleteIQ";

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    name: &'a str,
}

/// Render the bundled system instruction.
pub fn system_prompt(name: &str) -> Result<String, PromptError> {
    load_prompt(SYSTEM_TEMPLATE, &PromptContext { name })
}

/// Render an operator supplied system instruction template.
pub fn system_prompt_from_file(path: &Path, name: &str) -> Result<String, PromptError> {
    load_prompt_file(path, &PromptContext { name })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StarterTopic {
    pub label: &'static str,
    pub prompt: &'static str,
    pub icon: &'static str,
}

pub const STARTER_TOPICS: &[StarterTopic] = &[
    StarterTopic {
        label: "What is durability?",
        prompt: "Can you explain physiological durability in cycling and why it matters for race performance?",
        icon: "🚴",
    },
    StarterTopic {
        label: "CTL/ATL/TSB explained",
        prompt: "Break down the Banister fitness-fatigue model: what are CTL, ATL, and TSB and how do I use them to train smarter?",
        icon: "📊",
    },
    StarterTopic {
        label: "Do carbs affect my threshold?",
        prompt: "Does eating carbohydrates before exercise actually change my aerobic threshold or VO2max test results?",
        icon: "🍌",
    },
    StarterTopic {
        label: "HRV & recovery",
        prompt: "How should I use heart rate variability to guide my training? What counts as 'low' HRV?",
        icon: "❤️",
    },
    StarterTopic {
        label: "Polarized vs sweet spot",
        prompt: "What's the difference between polarized training and sweet spot training? Which has better evidence?",
        icon: "⚡",
    },
    StarterTopic {
        label: "How to peak for a race",
        prompt: "How should I structure my taper before a major race? How do I know when I'm peaked vs overtapered?",
        icon: "🏆",
    },
];
