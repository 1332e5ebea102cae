//! Lucene-style query string parser
//!
//! Supports syntax like:
//! - `+banana +over`
//! - `title:rust AND -draft`
//! - `text:"my banana"~2`
//! - `title:prog*`, `te?t`, `rust~1`
//! - `title:(dogs cats)^2`
//! - `year:[2020 TO *]`
//!
//! # Example
//!
//! ```rust
//! use spanlight::config::TokenizerConfig;
//! use spanlight::query::query_string::QueryStringParser;
//! use spanlight::schema::Schema;
//!
//! let schema = Schema::dynamic(TokenizerConfig::standard());
//! let query = QueryStringParser::new("+banana +over", &schema)
//!     .unwrap()
//!     .parse()
//!     .unwrap();
//! assert_eq!(query.to_string(), "(+text:banana +text:over)");
//! ```

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Token};
pub use parser::{QueryStringParser, DEFAULT_FIELD};
