use hashbrown::HashMap;
use std::collections::BTreeSet;

/// A single query term in canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::new(value)
    }
}

/// Inverted index: token to the pages containing it. Implementations
/// canonicalize (normalize, lemmatize) the token before lookup.
pub trait TokenIndex {
    fn page_urls_by_token(&self, token: &Token) -> Vec<String>;

    /// Register one occurrence; idempotent on `(token, page_url)`.
    fn add_entry(&mut self, token: &Token, page_url: &str);
}

/// Registry of all known pages and their on-disk locations.
pub trait PageIndex {
    fn all_page_urls(&self) -> Vec<String>;

    fn file_path_for(&self, url: &str) -> Option<String>;

    fn add_entry(&mut self, page_url: &str, file_path: &str);
}

/// In-memory inverted index. ASCII lowercasing stands in for the full
/// normalizer/lemmatizer chain of a production index.
#[derive(Debug, Default)]
pub struct InMemoryTokenIndex {
    entries: HashMap<String, BTreeSet<String>>,
}

impl InMemoryTokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn canonical(token: &Token) -> String {
        token.value().to_ascii_lowercase()
    }
}

impl TokenIndex for InMemoryTokenIndex {
    fn page_urls_by_token(&self, token: &Token) -> Vec<String> {
        self.entries
            .get(&Self::canonical(token))
            .map(|urls| urls.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn add_entry(&mut self, token: &Token, page_url: &str) {
        self.entries
            .entry(Self::canonical(token))
            .or_default()
            .insert(page_url.to_string());
    }
}

/// In-memory page registry preserving registration order.
#[derive(Debug, Default)]
pub struct InMemoryPageIndex {
    order: Vec<String>,
    paths: HashMap<String, String>,
}

impl InMemoryPageIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageIndex for InMemoryPageIndex {
    fn all_page_urls(&self) -> Vec<String> {
        self.order.clone()
    }

    fn file_path_for(&self, url: &str) -> Option<String> {
        self.paths.get(url).cloned()
    }

    fn add_entry(&mut self, page_url: &str, file_path: &str) {
        if !self.paths.contains_key(page_url) {
            self.order.push(page_url.to_string());
        }
        self.paths
            .insert(page_url.to_string(), file_path.to_string());
    }
}
