use std::collections::BTreeSet;

use crate::{
    BooleanSearch, Corpus, DocId, DocumentVectors, Normalizer, Postings, QueryVector, Ranking,
    Result, TermStatistics,
};

/// Everything derived from one corpus. Built once and only read afterwards; a
/// rebuilt corpus gets a new snapshot rather than an update to this one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    corpus: Corpus,
    boolean: BooleanSearch,
    statistics: TermStatistics,
    vectors: DocumentVectors,
}

impl Snapshot {
    pub fn build(corpus: Corpus) -> Self {
        let postings = Postings::build(&corpus);
        let boolean = BooleanSearch::new(postings, &corpus);
        let statistics = TermStatistics::compute(&corpus);
        let vectors = DocumentVectors::build(statistics.lemmas());
        tracing::info!(
            docs = corpus.len(),
            lemmas = boolean.postings().num_lemmas(),
            vectors = vectors.len(),
            "snapshot built"
        );
        Self { corpus, boolean, statistics, vectors }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn postings(&self) -> &Postings {
        self.boolean.postings()
    }

    pub fn statistics(&self) -> &TermStatistics {
        &self.statistics
    }

    pub fn vectors(&self) -> &DocumentVectors {
        &self.vectors
    }

    /// Boolean query; see [`BooleanSearch::search`].
    pub fn search(&self, query: &str) -> Result<BTreeSet<DocId>> {
        self.boolean.search(query)
    }

    pub fn query_vector(&self, query: &str, normalizer: &Normalizer) -> Option<QueryVector> {
        QueryVector::from_query(query, normalizer, self.statistics.lemmas())
    }

    /// Ranked vector-space query. A query without known lemmas ranks nothing.
    pub fn rank(&self, query: &str, normalizer: &Normalizer) -> Ranking {
        match self.query_vector(query, normalizer) {
            Some(vector) => self.vectors.rank(&vector),
            None => Ranking::empty(),
        }
    }
}
