use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Corpus, DocId};

/// Lemma -> documents containing it, plus the universe of indexed documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Postings {
    lists: BTreeMap<String, BTreeSet<DocId>>,
    all_documents: BTreeSet<DocId>,
}

impl Postings {
    /// Invert every document's lemma groups.
    pub fn build(corpus: &Corpus) -> Self {
        let mut lists: BTreeMap<String, BTreeSet<DocId>> = BTreeMap::new();
        let mut all_documents = BTreeSet::new();
        for doc in corpus.documents() {
            all_documents.insert(doc.id);
            for lemma in doc.lemmas() {
                lists.entry(lemma.to_string()).or_default().insert(doc.id);
            }
        }
        tracing::debug!(lemmas = lists.len(), docs = all_documents.len(), "built postings");
        Self { lists, all_documents }
    }

    /// Postings for `lemma`, or `None` when it never occurs.
    pub fn get(&self, lemma: &str) -> Option<&BTreeSet<DocId>> {
        self.lists.get(lemma)
    }

    pub fn all_documents(&self) -> &BTreeSet<DocId> {
        &self.all_documents
    }

    /// Lemmas with their postings in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<DocId>)> {
        self.lists.iter().map(|(lemma, docs)| (lemma.as_str(), docs))
    }

    pub fn num_lemmas(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, LemmaGroups};

    fn doc(id: DocId, groups: &[(&str, &[&str])]) -> Document {
        let mut lemma_groups = LemmaGroups::new();
        let mut tokens = Vec::new();
        for (lemma, toks) in groups {
            for t in *toks {
                tokens.push(t.to_string());
                lemma_groups.entry(lemma.to_string()).or_default().insert(t.to_string());
            }
        }
        Document::new(id, String::new(), tokens, lemma_groups)
    }

    #[test]
    fn membership_matches_lemma_groups() {
        let corpus = Corpus::from_documents(vec![
            doc(1, &[("кот", &["кот", "коты"]), ("собака", &["собаки"])]),
            doc(2, &[("кот", &["кота"])]),
            doc(3, &[("мышь", &["мыши"])]),
        ]);
        let postings = Postings::build(&corpus);

        for d in corpus.documents() {
            for (lemma, docs) in postings.iter() {
                assert_eq!(docs.contains(&d.id), d.lemma_groups.contains_key(lemma));
            }
            for lemma in d.lemmas() {
                assert!(postings.get(lemma).is_some());
            }
        }
        assert_eq!(postings.get("кот").unwrap().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(postings.all_documents().len(), 3);
        assert!(postings.get("коты").is_none());
    }

    #[test]
    fn empty_corpus_yields_empty_postings() {
        let postings = Postings::build(&Corpus::new());
        assert!(postings.is_empty());
        assert!(postings.all_documents().is_empty());
    }

    #[test]
    fn rebuild_is_deterministic() {
        let corpus = Corpus::from_documents(vec![
            doc(2, &[("б", &["бб"])]),
            doc(1, &[("а", &["аа"]), ("б", &["бб"])]),
        ]);
        assert_eq!(Postings::build(&corpus), Postings::build(&corpus));
    }
}
