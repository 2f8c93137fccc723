//! Prompt templates for each ad category.

use std::path::Path;

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde_json::Value;

/// General-purpose instruction used when no category is chosen.
pub const GENERAL_SYSTEM_PROMPT: &str = "You are Polo Ad GPT, an AI specialized in writing engaging, \
exciting social media ad posts specifically for polo events.

Read any data or context provided in the system or user messages, such as upcoming match details, \
past highlights, team names, dates and e-learning resources, and combine it into cohesive ads that \
sound human and engaging.

Write each post in an enthusiastic style suitable for social media, using emojis to add excitement. \
Weave together the upcoming match details, a reference to a past match or highlight related to the \
teams or event, and a relevant e-learning resource fans can check out. Keep posts under 500 \
characters where possible.

Assign each ad a Platform (Instagram, Twitter, Facebook, TikTok, LinkedIn...) and a Category \
(Match Promotion, Highlight Recap, Fan Engagement...). When asked for a batch, output a JSON array \
of objects with the keys \"Platform\", \"Category\" and \"Content\".

Base every ad on the context data provided so the copy reflects the specific matches and resources given.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    UpcomingMatch,
    Lesson,
    Course,
    Article,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::UpcomingMatch => "Upcoming Match",
            Category::Lesson => "Lesson",
            Category::Course => "Course",
            Category::Article => "Article",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Category::UpcomingMatch => {
                "You are the world's top-tier social media strategist for polo events. Your job is \
                 to craft high-converting Instagram ads that build excitement and drive viewer \
                 engagement."
            }
            Category::Lesson => {
                "You are a high-converting Instagram ad copywriter specializing in sports \
                 education. Your goal is to drive sign-ups and spark interest in polo training \
                 content."
            }
            Category::Course => {
                "You are a results-driven digital marketer focused on promoting online sports \
                 courses. Your specialty is writing irresistible Instagram captions that boost \
                 enrollment."
            }
            Category::Article => {
                "You are a social media content strategist for a leading polo media brand. You \
                 excel at turning long-form content into short, click-worthy Instagram captions."
            }
        }
    }

    fn user_template(self) -> &'static str {
        match self {
            Category::UpcomingMatch => {
                "Using the following match details:\n{info}\nCreate a compelling Instagram ad \
                 caption that captures the energy of the upcoming game. Make it visually \
                 engaging, emotionally resonant, and optimized to stop the scroll. Include a \
                 sense of urgency, key match details, and a call to watch or follow."
            }
            Category::Lesson => {
                "Given the following lesson details:\n{info}\nWrite an Instagram ad caption that \
                 highlights what the lesson teaches, why it matters, and who it's for. Use a \
                 confident tone, include benefits, and end with a clear call to action (e.g., \
                 'Watch now', 'Master your next move')."
            }
            Category::Course => {
                "Based on this course information:\n{info}\nWrite an Instagram ad that makes the \
                 course feel essential for anyone looking to level up their polo skills. \
                 Highlight outcomes, target audience, and create FOMO with urgency cues (e.g., \
                 'Limited spots', 'Enroll now')."
            }
            Category::Article => {
                "Using the article info below:\n{info}\nWrite a teaser Instagram caption that \
                 hooks attention, hints at the value of the article, and encourages followers to \
                 click the link or visit the site to read more. Use emotion, curiosity, or \
                 controversy if applicable."
            }
        }
    }

    /// User prompt with the record embedded as pretty-printed JSON.
    pub fn user_prompt(self, record: &Value) -> String {
        let info = serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string());
        self.user_template().replace("{info}", &info)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Read a record (one row of the data source) from a JSON file. It must be an object.
pub fn load_record(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read record {}", path.display()))?;
    let record: Value = serde_json::from_str(&content)
        .with_context(|| format!("record {} is not valid JSON", path.display()))?;
    if !record.is_object() {
        bail!("record {} must be a JSON object", path.display());
    }
    Ok(record)
}
