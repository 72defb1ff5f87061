use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashMap;

use crate::config::NormalizerConfig;
use crate::{DocId, Document};

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^а-яА-ЯёЁ-]").expect("valid regex");
}

/// Maps a surface token to its canonical form.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> String;
}

/// Snowball stemmer standing in for a dictionary lemmatizer.
pub struct StemLemmatizer {
    stemmer: Stemmer,
}

impl StemLemmatizer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { stemmer: Stemmer::create(algorithm) }
    }

    pub fn russian() -> Self {
        Self::new(Algorithm::Russian)
    }
}

impl Lemmatizer for StemLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        self.stemmer.stem(token).into_owned()
    }
}

/// Word-form lookup table; forms it does not know are their own lemma.
#[derive(Debug, Clone, Default)]
pub struct DictionaryLemmatizer {
    forms: HashMap<String, String>,
}

impl DictionaryLemmatizer {
    pub fn new(forms: HashMap<String, String>) -> Self {
        Self { forms }
    }

    /// Parse `form lemma` lines. Blank lines and lines starting with `#` are ignored,
    /// as are lines without a lemma column.
    pub fn parse(text: &str) -> Self {
        let forms = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| {
                let mut parts = l.split_whitespace();
                let form = parts.next()?.to_lowercase();
                let lemma = parts.next()?.to_lowercase();
                Some((form, lemma))
            })
            .collect();
        Self { forms }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Lemmatizer for DictionaryLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        self.forms.get(token).cloned().unwrap_or_else(|| token.to_string())
    }
}

/// Text -> filtered tokens -> lemmas. Stop-words and typos are fixed at construction.
pub struct Normalizer {
    config: NormalizerConfig,
    lemmatizer: Box<dyn Lemmatizer>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default(), Box::new(StemLemmatizer::russian()))
    }
}

impl Normalizer {
    pub fn new(config: NormalizerConfig, lemmatizer: Box<dyn Lemmatizer>) -> Self {
        Self { config, lemmatizer }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// NFKC, split on whitespace, drop everything but Cyrillic letters and hyphens,
    /// lowercase, then filter short words, stop-words and known typos.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>();
        normalized
            .split_whitespace()
            .map(|word| clean_word(word))
            .filter(|word| self.is_valid(word))
            .collect()
    }

    pub fn lemmatize(&self, token: &str) -> String {
        self.lemmatizer.lemmatize(token)
    }

    /// Lemmas of `text` in order, duplicates kept.
    pub fn lemmas(&self, text: &str) -> Vec<String> {
        self.tokenize(text).iter().map(|t| self.lemmatize(t)).collect()
    }

    pub fn normalize(&self, id: DocId, text: &str) -> Document {
        let tokens = self.tokenize(text);
        Document::from_tokens(id, text.to_string(), tokens, |t| self.lemmatize(t))
    }

    fn is_valid(&self, word: &str) -> bool {
        word.chars().count() >= self.config.min_token_chars
            && !self.config.stop_words.contains(word)
            && !self.config.typos.contains(word)
    }
}

fn clean_word(word: &str) -> String {
    NON_WORD.replace_all(word, "").trim_matches('-').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_and_lowercases() {
        assert_eq!(clean_word("«Собака»,"), "собака");
        assert_eq!(clean_word("-кто-то-"), "кто-то");
        assert_eq!(clean_word("hello123"), "");
    }

    #[test]
    fn dictionary_falls_back_to_form() {
        let lemmatizer = DictionaryLemmatizer::parse("коты кот\n# comment\nсобаки собака\nодинокий\n");
        assert_eq!(lemmatizer.len(), 2);
        assert_eq!(lemmatizer.lemmatize("коты"), "кот");
        assert_eq!(lemmatizer.lemmatize("мыши"), "мыши");
    }
}
