//! Term and document frequencies, and the TF-IDF weights derived from them.
//!
//! Two vocabularies are tracked side by side: raw tokens and lemmas. They share
//! the corpus size but never mix counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Corpus, DocId, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vocabulary {
    Token,
    Lemma,
}

impl Vocabulary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vocabulary::Token => "token",
            Vocabulary::Lemma => "lemma",
        }
    }
}

/// Term -> occurrences in one document, plus the document's token count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    counts: BTreeMap<String, u32>,
    total: u32,
}

impl FrequencyTable {
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for term in terms {
            *table.counts.entry(term.into()).or_insert(0) += 1;
            table.total += 1;
        }
        table
    }

    pub fn count(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn contains(&self, term: &str) -> bool {
        self.counts.contains_key(term)
    }

    /// `count / total`; zero for an empty table.
    pub fn tf(&self, term: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(term) as f64 / self.total as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(t, c)| (t.as_str(), *c))
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAnalysis {
    pub token_frequency: FrequencyTable,
    pub lemma_frequency: FrequencyTable,
}

impl DocumentAnalysis {
    pub fn total_tokens(&self) -> u32 {
        self.token_frequency.total()
    }
}

/// Count tokens and the lemmas the document grouped them under.
pub fn analyze(doc: &Document) -> DocumentAnalysis {
    let token_lemmas = doc.token_lemmas();
    let token_frequency = FrequencyTable::from_terms(doc.tokens.iter().map(String::as_str));
    let lemma_frequency = FrequencyTable::from_terms(
        doc.tokens
            .iter()
            .map(|t| token_lemmas.get(t.as_str()).copied().unwrap_or(t.as_str())),
    );
    DocumentAnalysis { token_frequency, lemma_frequency }
}

/// One term's entry in a document's TF-IDF listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermWeight<'a> {
    pub term: &'a str,
    pub idf: f64,
    pub tfidf: f64,
}

/// Frequencies of one vocabulary across the corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermSpace {
    frequencies: BTreeMap<DocId, FrequencyTable>,
    document_frequency: BTreeMap<String, u32>,
    num_docs: usize,
}

impl TermSpace {
    /// Empty tables are dropped; `num_docs` still counts their documents.
    pub fn build<I>(num_docs: usize, tables: I) -> Self
    where
        I: IntoIterator<Item = (DocId, FrequencyTable)>,
    {
        let frequencies: BTreeMap<DocId, FrequencyTable> =
            tables.into_iter().filter(|(_, t)| !t.is_empty()).collect();
        let mut document_frequency: BTreeMap<String, u32> = BTreeMap::new();
        for table in frequencies.values() {
            for term in table.terms() {
                *document_frequency.entry(term.to_string()).or_insert(0) += 1;
            }
        }
        Self { frequencies, document_frequency, num_docs }
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// `ln(N / df)`, or zero for a term no document contains.
    pub fn idf(&self, term: &str) -> f64 {
        let df = self.document_frequency(term);
        if df == 0 {
            return 0.0;
        }
        (self.num_docs as f64 / df as f64).ln()
    }

    pub fn frequencies(&self, doc: DocId) -> Option<&FrequencyTable> {
        self.frequencies.get(&doc)
    }

    pub fn tf(&self, doc: DocId, term: &str) -> f64 {
        self.frequencies(doc).map_or(0.0, |t| t.tf(term))
    }

    /// `(term, idf, tfidf)` for every term of `doc`, terms in lexicographic order.
    pub fn weights(&self, doc: DocId) -> impl Iterator<Item = TermWeight<'_>> {
        self.frequencies(doc).into_iter().flat_map(move |table| {
            table.terms().map(move |term| {
                let idf = self.idf(term);
                TermWeight { term, idf, tfidf: table.tf(term) * idf }
            })
        })
    }

    /// Documents that produced a non-empty table.
    pub fn documents(&self) -> impl Iterator<Item = DocId> + '_ {
        self.frequencies.keys().copied()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.document_frequency.len()
    }
}

/// Token and lemma spaces computed together in one pass over the corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermStatistics {
    tokens: TermSpace,
    lemmas: TermSpace,
}

impl TermStatistics {
    pub fn compute(corpus: &Corpus) -> Self {
        let num_docs = corpus.len();
        let mut token_tables = Vec::with_capacity(num_docs);
        let mut lemma_tables = Vec::with_capacity(num_docs);
        for doc in corpus.documents() {
            let analysis = analyze(doc);
            token_tables.push((doc.id, analysis.token_frequency));
            lemma_tables.push((doc.id, analysis.lemma_frequency));
        }
        let stats = Self {
            tokens: TermSpace::build(num_docs, token_tables),
            lemmas: TermSpace::build(num_docs, lemma_tables),
        };
        tracing::debug!(
            docs = num_docs,
            tokens = stats.tokens.vocabulary_size(),
            lemmas = stats.lemmas.vocabulary_size(),
            "computed term statistics"
        );
        stats
    }

    pub fn space(&self, vocabulary: Vocabulary) -> &TermSpace {
        match vocabulary {
            Vocabulary::Token => &self.tokens,
            Vocabulary::Lemma => &self.lemmas,
        }
    }

    pub fn tokens(&self) -> &TermSpace {
        &self.tokens
    }

    pub fn lemmas(&self) -> &TermSpace {
        &self.lemmas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        let lemma = |t: &str| t.trim_end_matches('ы').to_string();
        let doc = |id, words: &[&str]| {
            Document::from_tokens(id, String::new(), words.iter().map(|w| w.to_string()).collect(), lemma)
        };
        Corpus::from_documents(vec![
            doc(1, &["кот", "коты", "собака", "кот"]),
            doc(2, &["кот", "мышь"]),
            doc(3, &["мышь", "сыр", "сыр"]),
            doc(4, &[]),
        ])
    }

    #[test]
    fn counts_sum_to_total_tokens() {
        let corpus = corpus();
        for doc in corpus.documents() {
            let analysis = analyze(doc);
            let token_sum: u32 = analysis.token_frequency.iter().map(|(_, c)| c).sum();
            let lemma_sum: u32 = analysis.lemma_frequency.iter().map(|(_, c)| c).sum();
            assert_eq!(token_sum as usize, doc.tokens.len());
            assert_eq!(lemma_sum, analysis.total_tokens());
        }
    }

    #[test]
    fn lemma_space_merges_word_forms() {
        let stats = TermStatistics::compute(&corpus());
        assert_eq!(stats.tokens().frequencies(1).unwrap().count("коты"), 1);
        assert_eq!(stats.lemmas().frequencies(1).unwrap().count("кот"), 3);
        assert!(!stats.lemmas().frequencies(1).unwrap().contains("коты"));
        assert!((stats.lemmas().tf(1, "кот") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn empty_documents_are_skipped_but_counted() {
        let stats = TermStatistics::compute(&corpus());
        assert!(stats.tokens().frequencies(4).is_none());
        assert_eq!(stats.tokens().num_docs(), 4);
        assert_eq!(stats.tokens().tf(4, "кот"), 0.0);
    }

    #[test]
    fn idf_follows_document_frequency() {
        let stats = TermStatistics::compute(&corpus());
        let lemmas = stats.lemmas();
        assert_eq!(lemmas.document_frequency("кот"), 2);
        assert_eq!(lemmas.document_frequency("собака"), 1);
        assert!((lemmas.idf("кот") - (4.0f64 / 2.0).ln()).abs() < 1e-12);
        assert!(lemmas.idf("собака") > lemmas.idf("кот"));
        assert_eq!(lemmas.idf("слон"), 0.0);

        for (term, df) in [("кот", 2), ("мышь", 2), ("сыр", 1)] {
            assert_eq!(lemmas.document_frequency(term), df);
            assert!(df >= 1 && df as usize <= lemmas.num_docs());
        }
    }

    #[test]
    fn weights_list_every_term_once() {
        let stats = TermStatistics::compute(&corpus());
        let weights: Vec<_> = stats.lemmas().weights(3).collect();
        assert_eq!(weights.iter().map(|w| w.term).collect::<Vec<_>>(), vec!["мышь", "сыр"]);
        let cheese = weights[1];
        assert!((cheese.tfidf - (2.0 / 3.0) * 4.0f64.ln()).abs() < 1e-12);
        assert_eq!(stats.lemmas().weights(4).count(), 0);
    }
}
