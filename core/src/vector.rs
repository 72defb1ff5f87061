use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::stats::{FrequencyTable, TermSpace};
use crate::{DocId, Normalizer};

/// Sparse term -> weight vector with its Euclidean norm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermVector {
    weights: HashMap<String, f64>,
    norm: f64,
}

impl TermVector {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &HashMap<String, f64> {
        &self.weights
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Walks the shorter vector and looks terms up in the longer one.
    pub fn dot(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        small
            .weights
            .iter()
            .map(|(term, w)| w * large.weight(term))
            .sum()
    }

    /// Cosine similarity; zero when either vector has no length.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        self.dot(other) / (self.norm * other.norm)
    }
}

/// Query side of a vector search. Only exists with a non-zero norm.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVector(TermVector);

impl QueryVector {
    /// TF over the query's own lemmas times corpus IDF. `None` when there are no
    /// lemmas or none of them occurs in the corpus.
    pub fn from_lemmas<I, S>(lemmas: I, idf: &TermSpace) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = FrequencyTable::from_terms(lemmas);
        if table.is_empty() {
            return None;
        }
        let weights = table
            .terms()
            .map(|lemma| (lemma.to_string(), table.tf(lemma) * idf.idf(lemma)))
            .collect();
        let vector = TermVector::new(weights);
        if vector.norm() == 0.0 {
            return None;
        }
        Some(Self(vector))
    }

    pub fn from_query(query: &str, normalizer: &Normalizer, idf: &TermSpace) -> Option<Self> {
        Self::from_lemmas(normalizer.lemmas(query), idf)
    }

    pub fn vector(&self) -> &TermVector {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Documents with a positive score, best first. Consumed once.
#[derive(Debug)]
pub struct Ranking {
    inner: std::vec::IntoIter<ScoredDoc>,
}

impl Ranking {
    pub fn empty() -> Self {
        Self { inner: Vec::new().into_iter() }
    }
}

impl Iterator for Ranking {
    type Item = ScoredDoc;

    fn next(&mut self) -> Option<ScoredDoc> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Ranking {}

/// TF-IDF vector of every document with at least one token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentVectors {
    vectors: BTreeMap<DocId, TermVector>,
}

impl DocumentVectors {
    pub fn build(space: &TermSpace) -> Self {
        let vectors = space
            .documents()
            .map(|doc| {
                let weights = space.weights(doc).map(|w| (w.term.to_string(), w.tfidf)).collect();
                (doc, TermVector::new(weights))
            })
            .collect();
        Self { vectors }
    }

    pub fn get(&self, doc: DocId) -> Option<&TermVector> {
        self.vectors.get(&doc)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Score every document against `query`, keep positive scores, order by score
    /// descending and then by document id ascending.
    pub fn rank(&self, query: &QueryVector) -> Ranking {
        let mut scored = Vec::with_capacity(self.vectors.len());
        for (&doc_id, vector) in &self.vectors {
            let score = query.vector().cosine(vector);
            if score > 0.0 {
                scored.push(ScoredDoc { doc_id, score });
            }
        }
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        Ranking { inner: scored.into_iter() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(pairs: &[(&str, f64)]) -> TermVector {
        TermVector::new(pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect())
    }

    #[test]
    fn norm_and_dot() {
        let a = vector(&[("x", 3.0), ("y", 4.0)]);
        let b = vector(&[("y", 1.0)]);
        assert_eq!(a.norm(), 5.0);
        assert_eq!(a.dot(&b), 4.0);
        assert_eq!(b.dot(&a), 4.0);
        assert!((a.cosine(&b) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn proportional_vectors_score_one() {
        let a = vector(&[("x", 1.0), ("y", 2.0)]);
        let b = vector(&[("x", 2.0), ("y", 4.0)]);
        assert!((a.cosine(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_norm_scores_zero() {
        let a = vector(&[("x", 1.0)]);
        let zero = vector(&[("x", 0.0)]);
        assert_eq!(a.cosine(&zero), 0.0);
        assert_eq!(a.cosine(&TermVector::default()), 0.0);
    }

    #[test]
    fn empty_ranking_yields_nothing() {
        assert_eq!(Ranking::empty().len(), 0);
    }
}
