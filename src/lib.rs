pub mod config;
pub mod error;
pub mod highlight;
pub mod index;
pub mod metrics;
pub mod models;
pub mod query;
pub mod schema;
pub mod tokenizer;

pub use config::{HighlightConfig, TokenizerConfig};
pub use error::{HighlightError, Result};
pub use highlight::{HighlightRequest, HighlightResponse, SpanHighlighter};
pub use models::*;
pub use tokenizer::Analyzer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
