use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::DocId;

/// Lemma -> distinct surface tokens recorded under it.
pub type LemmaGroups = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    /// Visible text of the page, kept for snippets.
    pub text: String,
    /// Normalized tokens in document order, duplicates included.
    pub tokens: Vec<String>,
    pub lemma_groups: LemmaGroups,
}

impl Document {
    pub fn new(id: DocId, text: String, tokens: Vec<String>, lemma_groups: LemmaGroups) -> Self {
        Self { id, text, tokens, lemma_groups }
    }

    /// Build a document whose lemma groups come from `lemmatize`.
    pub fn from_tokens<F>(id: DocId, text: String, tokens: Vec<String>, lemmatize: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        let mut lemma_groups = LemmaGroups::new();
        for token in &tokens {
            lemma_groups
                .entry(lemmatize(token))
                .or_default()
                .insert(token.clone());
        }
        Self { id, text, tokens, lemma_groups }
    }

    pub fn lemmas(&self) -> impl Iterator<Item = &str> {
        self.lemma_groups.keys().map(String::as_str)
    }

    /// Token -> lemma for every grouped token of this document.
    pub fn token_lemmas(&self) -> BTreeMap<&str, &str> {
        let mut map = BTreeMap::new();
        for (lemma, tokens) in &self.lemma_groups {
            for token in tokens {
                map.entry(token.as_str()).or_insert(lemma.as_str());
            }
        }
        map
    }
}

/// Immutable set of normalized documents plus the id -> URL mapping from the crawl.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    documents: BTreeMap<DocId, Document>,
    urls: BTreeMap<DocId, String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents<I: IntoIterator<Item = Document>>(documents: I) -> Self {
        let documents = documents.into_iter().map(|d| (d.id, d)).collect();
        Self { documents, urls: BTreeMap::new() }
    }

    pub fn with_urls(mut self, urls: BTreeMap<DocId, String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Documents in ascending id order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.documents.keys().copied()
    }

    pub fn url(&self, id: DocId) -> Option<&str> {
        self.urls.get(&id).map(String::as_str)
    }

    pub fn urls(&self) -> &BTreeMap<DocId, String> {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
