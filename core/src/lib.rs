pub mod boolean;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod snapshot;
pub mod stats;
pub mod tokenizer;
pub mod vector;

/// 1-based page number assigned by the crawler; stable for the lifetime of a corpus.
pub type DocId = u32;

pub use boolean::{BooleanSearch, Operator, QueryToken};
pub use corpus::{Corpus, Document, LemmaGroups};
pub use error::{Error, MalformedQuery, Result};
pub use index::Postings;
pub use snapshot::Snapshot;
pub use stats::{TermStatistics, Vocabulary};
pub use tokenizer::{Lemmatizer, Normalizer};
pub use vector::{DocumentVectors, QueryVector, Ranking, ScoredDoc, TermVector};
