//! Normalizer configuration.
//!
//! [`NormalizerConfig`] is the in-memory form handed to the normalizer once;
//! [`NormalizerSettings`] records where it was loaded from so a query-time
//! process can rebuild the exact normalizer the index was built with.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tokenizer::{DictionaryLemmatizer, Lemmatizer, Normalizer, StemLemmatizer};
use crate::Result;

lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "без","более","бы","был","была","были","было","быть","вам","вас","весь","во","вот","все","всего","всех","вы",
            "где","да","даже","для","до","его","ее","её","ей","ему","если","есть","еще","ещё","же","за","здесь",
            "из","или","им","их","как","какая","какой","когда","кого","кто","ли","либо","мне","может","мы",
            "на","над","нам","нас","не","него","нее","неё","нет","ни","них","но","ну","об","однако","он","она","они","оно","от","очень",
            "по","под","после","при","про","раз","с","свой","себя","со","так","также","такой","там","те","тем","то","того","тоже","той","только","том","ты",
            "уже","хотя","чем","через","что","чтобы","чье","чья","эта","эти","это","этого","этой","этом","этот",
        ];
        words.iter().copied().collect()
    };
}

/// Minimum token length (in characters) kept by default.
pub const DEFAULT_MIN_TOKEN_CHARS: usize = 3;

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub stop_words: HashSet<String>,
    pub typos: HashSet<String>,
    pub min_token_chars: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stop_words: STOPWORDS.iter().map(|w| w.to_string()).collect(),
            typos: HashSet::new(),
            min_token_chars: DEFAULT_MIN_TOKEN_CHARS,
        }
    }
}

impl NormalizerConfig {
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        self
    }

    pub fn with_typos<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.typos = words.into_iter().map(|w| w.as_ref().to_lowercase()).collect();
        self
    }
}

/// Where the stop-word, typo and lemma dictionary files live. `None` means built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerSettings {
    #[serde(default)]
    pub stop_words: Option<PathBuf>,
    #[serde(default)]
    pub typos: Option<PathBuf>,
    #[serde(default)]
    pub lemma_dictionary: Option<PathBuf>,
}

impl NormalizerSettings {
    pub fn load_config(&self) -> Result<NormalizerConfig> {
        let mut config = NormalizerConfig::default();
        if let Some(path) = &self.stop_words {
            config = config.with_stop_words(read_word_list(path)?);
        }
        if let Some(path) = &self.typos {
            config = config.with_typos(read_word_list(path)?);
        }
        Ok(config)
    }

    pub fn load_lemmatizer(&self) -> Result<Box<dyn Lemmatizer>> {
        match &self.lemma_dictionary {
            Some(path) => {
                let dictionary = DictionaryLemmatizer::parse(&fs::read_to_string(path)?);
                tracing::debug!(forms = dictionary.len(), path = %path.display(), "loaded lemma dictionary");
                Ok(Box::new(dictionary))
            }
            None => Ok(Box::new(StemLemmatizer::russian())),
        }
    }

    pub fn build(&self) -> Result<Normalizer> {
        Ok(Normalizer::new(self.load_config()?, self.load_lemmatizer()?))
    }
}

/// One word per line; blank lines skipped, words trimmed and lower-cased.
pub fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect())
}
