use super::tokenizer::{AnalyzedToken, Tokenizer};
use crate::config::TokenizerConfig;

/// Per-field analysis chain
#[derive(Debug)]
pub enum Analyzer {
    /// Word segmentation followed by the tokenizer's filters
    Text(Tokenizer),
    /// The whole value is a single token
    Keyword,
}

impl Analyzer {
    /// Build a text analyzer from tokenizer settings
    pub fn text(config: &TokenizerConfig) -> Self {
        Analyzer::Text(Tokenizer::new(config))
    }

    /// Resolve a named analyzer (`standard`, `english`, `simple`, `keyword`)
    pub fn by_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("keyword") {
            return Some(Analyzer::Keyword);
        }
        TokenizerConfig::for_analyzer(name).map(|config| Self::text(&config))
    }

    /// Analyze one value
    pub fn analyze(&self, text: &str) -> Vec<AnalyzedToken> {
        self.analyze_value(text).0
    }

    /// Analyze one value, also returning the positions it consumed
    ///
    /// The count covers filtered words at the end of the value, which
    /// matters when the next value of a field continues the positions.
    pub fn analyze_value(&self, text: &str) -> (Vec<AnalyzedToken>, u32) {
        match self {
            Analyzer::Text(tokenizer) => tokenizer.analyze_value(text),
            Analyzer::Keyword => {
                if text.is_empty() {
                    return (Vec::new(), 0);
                }
                let token = AnalyzedToken {
                    term: text.to_string(),
                    position: 0,
                    start: 0,
                    end: text.chars().count(),
                };
                (vec![token], 1)
            }
        }
    }

    /// Normalize a pattern term (wildcard, prefix, fuzzy) for this field
    pub fn normalize_pattern(&self, term: &str) -> String {
        match self {
            Analyzer::Text(tokenizer) => tokenizer.normalize_pattern(term),
            Analyzer::Keyword => term.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_analyzer_single_token() {
        let analyzer = Analyzer::by_name("keyword").unwrap();
        let tokens = analyzer.analyze("New York");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "New York");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 8));
        assert!(analyzer.analyze("").is_empty());
    }

    #[test]
    fn test_named_text_analyzer() {
        let analyzer = Analyzer::by_name("standard").unwrap();
        let terms: Vec<String> = analyzer
            .analyze("A Banana")
            .into_iter()
            .map(|t| t.term)
            .collect();
        assert_eq!(terms, vec!["a", "banana"]);
    }

    #[test]
    fn test_positions_consumed_include_trailing_stopwords() {
        let analyzer = Analyzer::by_name("english").unwrap();
        let (tokens, positions) = analyzer.analyze_value("my banana is");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].position, 1);
        assert_eq!(positions, 3);

        let keyword = Analyzer::by_name("keyword").unwrap();
        assert_eq!(keyword.analyze_value("New York").1, 1);
        assert_eq!(keyword.analyze_value("").1, 0);
    }

    #[test]
    fn test_unknown_analyzer() {
        assert!(Analyzer::by_name("nope").is_none());
    }
}
