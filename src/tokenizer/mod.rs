//! Text analysis
//!
//! Turns raw field text into position- and offset-annotated tokens.

mod analyzer;
#[allow(clippy::module_inception)]
mod tokenizer;

pub use analyzer::Analyzer;
pub use tokenizer::{AnalyzedToken, Tokenizer};
