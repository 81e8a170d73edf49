//! AI assist for brandmatch: prompt rendering, the Gemini text client and
//! best-effort parsing of the free text it returns.
//!
//! The orchestrator and the HTTP server only see the [`TextGenerator`] trait,
//! so both can run against scripted generators in tests.

pub mod error;
pub mod gemini;
pub mod generator;
pub mod parser;
pub mod prompt;

pub use error::AiError;
pub use gemini::{GeminiClient, GeminiSettings};
pub use generator::{GenerationParams, TextGenerator, UnconfiguredGenerator};
pub use parser::{
    parse_insight_text, parse_strategy_text, CallToActionCount, ExampleCategory, InsightSections,
    ParsedInsight, ParsedStrategy, QuotedExample, StrategySection, ToneOfVoice,
};
pub use prompt::{build_prompt, PromptKind, STRATEGY_SECTIONS};
