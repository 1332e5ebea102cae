//! Lexer for query string syntax
//!
//! Tokenizes Lucene-style query strings into a stream of tokens. Operators
//! (`AND`, `OR`, `NOT`, `TO`) are only recognized in upper case, so ordinary
//! lower-case words such as "to" or "and" stay searchable terms.

use crate::error::HighlightError;
use crate::Result;

/// Token types for query string parsing
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A term (unquoted word, possibly containing wildcards)
    Term(String),
    /// A quoted string (phrase)
    QuotedString(String),

    /// AND operator
    And,
    /// OR operator
    Or,
    /// NOT operator
    Not,
    /// Colon separator (field:value)
    Colon,

    /// Standalone asterisk (`*` or `*:*`)
    Asterisk,

    /// Tilde with optional distance (fuzzy) or slop (phrase)
    Tilde(Option<u32>),
    /// Caret for boosting with optional boost value
    Caret(Option<f32>),

    /// Left square bracket (inclusive range start)
    LeftBracket,
    /// Right square bracket (inclusive range end)
    RightBracket,
    /// Left curly brace (exclusive range start)
    LeftBrace,
    /// Right curly brace (exclusive range end)
    RightBrace,
    /// TO keyword for ranges
    To,

    /// Left parenthesis (grouping)
    LeftParen,
    /// Right parenthesis (grouping)
    RightParen,

    /// Plus sign (required clause)
    Plus,
    /// Minus sign (prohibited clause)
    Minus,

    /// End of input
    Eof,
}

/// Lexer for tokenizing query strings
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        let single = match ch {
            ':' => Some(Token::Colon),
            '[' => Some(Token::LeftBracket),
            ']' => Some(Token::RightBracket),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '~' => {
                self.advance();
                Ok(Token::Tilde(self.read_unsigned_int()))
            }
            '^' => {
                self.advance();
                Ok(Token::Caret(self.read_float()))
            }
            '"' => {
                self.advance();
                self.read_quoted_string()
            }
            // A wildcard followed by word characters is a leading-wildcard term
            '*' | '?' if self.peek().map(Self::is_term_char).unwrap_or(false) => self.read_term(),
            '*' => {
                self.advance();
                Ok(Token::Asterisk)
            }
            _ if Self::is_term_start(ch) => self.read_term(),
            _ => Err(HighlightError::QueryParseError(format!(
                "Unexpected character at position {}: '{}'",
                self.position, ch
            ))),
        }
    }

    fn read_term(&mut self) -> Result<Token> {
        let mut term = String::new();

        while let Some(ch) = self.current_char() {
            if !Self::is_term_char(ch) {
                break;
            }
            term.push(ch);
            self.advance();
        }

        Ok(match term.as_str() {
            "AND" | "&&" => Token::And,
            "OR" | "||" => Token::Or,
            "NOT" => Token::Not,
            "TO" => Token::To,
            _ => Token::Term(term),
        })
    }

    fn read_quoted_string(&mut self) -> Result<Token> {
        let mut s = String::new();

        while let Some(ch) = self.current_char() {
            self.advance();
            match ch {
                '"' => return Ok(Token::QuotedString(s)),
                '\\' => {
                    if let Some(escaped) = self.current_char() {
                        s.push(escaped);
                        self.advance();
                    }
                }
                _ => s.push(ch),
            }
        }

        Err(HighlightError::QueryParseError(
            "Unterminated quoted string".to_string(),
        ))
    }

    fn read_unsigned_int(&mut self) -> Option<u32> {
        let mut num_str = String::new();

        while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
            num_str.push(ch);
            self.advance();
        }

        num_str.parse().ok()
    }

    fn read_float(&mut self) -> Option<f32> {
        let mut num_str = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
            } else if ch == '.' && !has_dot {
                has_dot = true;
                num_str.push(ch);
            } else {
                break;
            }
            self.advance();
        }

        num_str.parse().ok()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().map(char::is_whitespace).unwrap_or(false) {
            self.advance();
        }
    }

    /// Check if a character can start a term
    fn is_term_start(ch: char) -> bool {
        ch.is_alphanumeric() || matches!(ch, '_' | '@' | '#' | '&' | '|' | '?')
    }

    /// Check if a character can be part of a term
    fn is_term_char(ch: char) -> bool {
        ch.is_alphanumeric()
            || matches!(
                ch,
                '_' | '-' | '.' | '@' | '#' | '\'' | '/' | '&' | '|' | '*' | '?'
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    fn term(s: &str) -> Token {
        Token::Term(s.to_string())
    }

    #[test]
    fn test_field_value() {
        assert_eq!(tokens("title:rust"), vec![term("title"), Token::Colon, term("rust")]);
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(
            tokens("a AND b OR c NOT d"),
            vec![
                term("a"),
                Token::And,
                term("b"),
                Token::Or,
                term("c"),
                Token::Not,
                term("d")
            ]
        );
        assert_eq!(tokens("a && b || c"), vec![term("a"), Token::And, term("b"), Token::Or, term("c")]);
    }

    #[test]
    fn test_lowercase_operators_are_terms() {
        assert_eq!(
            tokens("over to there and back"),
            vec![term("over"), term("to"), term("there"), term("and"), term("back")]
        );
    }

    #[test]
    fn test_quoted_string() {
        assert_eq!(
            tokens("\"hello \\\"world\\\"\"~2"),
            vec![Token::QuotedString("hello \"world\"".to_string()), Token::Tilde(Some(2))]
        );
    }

    #[test]
    fn test_fuzzy_and_boost() {
        assert_eq!(tokens("rust~2"), vec![term("rust"), Token::Tilde(Some(2))]);
        assert_eq!(tokens("rust~"), vec![term("rust"), Token::Tilde(None)]);
        assert_eq!(tokens("rust^2.5"), vec![term("rust"), Token::Caret(Some(2.5))]);
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(tokens("prog*"), vec![term("prog*")]);
        assert_eq!(tokens("*ana"), vec![term("*ana")]);
        assert_eq!(tokens("?ver"), vec![term("?ver")]);
        assert_eq!(tokens("*:*"), vec![Token::Asterisk, Token::Colon, Token::Asterisk]);
    }

    #[test]
    fn test_apostrophes_and_dates_stay_in_terms() {
        assert_eq!(tokens("don't"), vec![term("don't")]);
        assert_eq!(tokens("2024-01-15"), vec![term("2024-01-15")]);
    }

    #[test]
    fn test_range() {
        assert_eq!(
            tokens("year:{10 TO 20]"),
            vec![
                term("year"),
                Token::Colon,
                Token::LeftBrace,
                term("10"),
                Token::To,
                term("20"),
                Token::RightBracket
            ]
        );
    }

    #[test]
    fn test_plus_minus_and_grouping() {
        assert_eq!(
            tokens("+required -(a b)"),
            vec![
                Token::Plus,
                term("required"),
                Token::Minus,
                Token::LeftParen,
                term("a"),
                term("b"),
                Token::RightParen
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("\"unterminated").next_token().is_err());
        assert!(Lexer::new("!bang").next_token().is_err());
    }
}
