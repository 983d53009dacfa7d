//! Prompt composition: the service-owned instruction block merged with
//! client formatting and tone preferences.
//!
//! Client-supplied `format` and `persona` values are parsed into closed
//! enums and interpolated as data; they can never replace or extend the
//! instruction block itself.

use crate::services::providers::ChatMessage;

/// Instruction block prepended to every summarization request.
const CORE_INSTRUCTIONS: &str = "You are an expert at distilling long-form \
content into compelling, standalone snippets. Identify the moments most \
likely to resonate with a reader: key ideas, surprising facts, and powerful \
statements.

Guidelines:
- Every snippet must be complete and understandable on its own
- Prefer what is interesting, surprising, or emotionally resonant
- Stay accurate; never introduce information absent from the source
- Use clear, engaging language";

/// Separator the model is asked to place between snippets.
pub const SNIPPET_SEPARATOR: &str = "---";

/// Ceiling on snippets requested for very long inputs.
const MAX_SNIPPETS: usize = 10;

/// Recognized snippet output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    #[default]
    ConciseParagraph,
    BulletPoints,
    NumberedList,
    KeyTakeaways,
}

impl SummaryFormat {
    /// Map a client-supplied name onto a known format; anything
    /// unrecognized falls back to the default.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("bullet points" | "bullets") => SummaryFormat::BulletPoints,
            Some("numbered list" | "numbered") => SummaryFormat::NumberedList,
            Some("key takeaways" | "takeaways") => SummaryFormat::KeyTakeaways,
            _ => SummaryFormat::ConciseParagraph,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            SummaryFormat::ConciseParagraph => "a single concise paragraph",
            SummaryFormat::BulletPoints => "a short list of bullet points",
            SummaryFormat::NumberedList => "a numbered list",
            SummaryFormat::KeyTakeaways => "a brief set of key takeaways",
        }
    }
}

/// Recognized tone presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Neutral,
    Professional,
    Casual,
    Enthusiastic,
}

impl Persona {
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("professional") => Persona::Professional,
            Some("casual" | "conversational") => Persona::Casual,
            Some("enthusiastic" | "energetic") => Persona::Enthusiastic,
            _ => Persona::Neutral,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Persona::Neutral => "neutral and balanced",
            Persona::Professional => "polished and professional",
            Persona::Casual => "casual and conversational",
            Persona::Enthusiastic => "energetic and enthusiastic",
        }
    }
}

/// The model-ready request produced by `compose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub messages: Vec<ChatMessage>,
    /// How many snippets the model is asked for.
    pub snippet_count: usize,
}

/// Scale the snippet target with input length, roughly one per 300 words.
pub fn snippet_count(text: &str) -> usize {
    let word_count = text.split_whitespace().count();

    if word_count < 300 {
        1
    } else if word_count < 600 {
        2
    } else if word_count < 1200 {
        3
    } else if word_count < 2000 {
        5
    } else if word_count < 3000 {
        7
    } else {
        MAX_SNIPPETS
    }
}

/// Build the ordered message list for one summarization call.
///
/// Deterministic: identical inputs always produce the identical list.
pub fn compose(text: &str, format: Option<&str>, persona: Option<&str>) -> ComposedPrompt {
    let count = snippet_count(text);
    let format = SummaryFormat::parse(format);
    let persona = Persona::parse(persona);

    let system = format!(
        "{}\n\nOutput format for each snippet: {}.\n\nTone and style: {}.",
        CORE_INSTRUCTIONS,
        format.directive(),
        persona.directive()
    );

    let user = format!(
        "Extract {count} distinct, compelling snippets from the text below. \
         Each snippet should capture a different idea or moment. Present each \
         snippet on its own line, separated by \"{SNIPPET_SEPARATOR}\".\n\nText:\n{text}"
    );

    ComposedPrompt {
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        snippet_count: count,
    }
}

/// Split model output on the separator, falling back to the whole content
/// when the model ignored the separator instruction.
pub fn split_snippets(content: &str) -> Vec<String> {
    let snippets: Vec<String> = content
        .split(SNIPPET_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if snippets.is_empty() {
        vec![content.trim().to_owned()]
    } else {
        snippets
    }
}
