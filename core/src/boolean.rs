//! Boolean set-algebra queries over the inverted index.
//!
//! A query goes through four stages: lexing into [`QueryToken`]s, expanding
//! surface operands to the lemmas the corpus recorded them under, shunting-yard
//! conversion to postfix, and evaluation of the postfix stream against postings.
//!
//! ```text
//! кот AND (собака OR NOT мышь)
//!   lex/expand  кот AND ( собака OR NOT мышь )
//!   postfix     кот собака мышь NOT OR AND
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::MalformedQuery;
use crate::{Corpus, DocId, Postings, Result};

lazy_static! {
    static ref QUERY_TOKEN: Regex = Regex::new(r"[()]|[^\s()]+").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Not => 3,
            Operator::And => 2,
            Operator::Or => 1,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Operator::Not => 1,
            Operator::And | Operator::Or => 2,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("AND") {
            Some(Operator::And)
        } else if word.eq_ignore_ascii_case("OR") {
            Some(Operator::Or)
        } else if word.eq_ignore_ascii_case("NOT") {
            Some(Operator::Not)
        } else {
            None
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryToken {
    Operand(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl QueryToken {
    pub fn operand<S: Into<String>>(term: S) -> Self {
        QueryToken::Operand(term.into())
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            QueryToken::And => Some(Operator::And),
            QueryToken::Or => Some(Operator::Or),
            QueryToken::Not => Some(Operator::Not),
            _ => None,
        }
    }
}

impl From<Operator> for QueryToken {
    fn from(op: Operator) -> Self {
        match op {
            Operator::And => QueryToken::And,
            Operator::Or => QueryToken::Or,
            Operator::Not => QueryToken::Not,
        }
    }
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryToken::Operand(term) => f.write_str(term),
            QueryToken::LParen => f.write_str("("),
            QueryToken::RParen => f.write_str(")"),
            other => match other.operator() {
                Some(op) => write!(f, "{op}"),
                None => Ok(()),
            },
        }
    }
}

/// Split a query into brackets, reserved words and lower-cased operands.
pub fn lex(query: &str) -> Vec<QueryToken> {
    QUERY_TOKEN
        .find_iter(query)
        .map(|m| match m.as_str() {
            "(" => QueryToken::LParen,
            ")" => QueryToken::RParen,
            word => match Operator::from_word(word) {
                Some(op) => op.into(),
                None => QueryToken::Operand(word.to_lowercase()),
            },
        })
        .collect()
}

/// Infix to postfix. An incoming operator pops every stacked operator of equal or
/// higher precedence, so same-precedence operators associate to the left.
///
/// An operator directly after `NOT` would pop that `NOT` before its operand is
/// emitted, so `NOT NOT x` and `NOT AND x` are rejected here rather than
/// evaluated with shifted operands.
pub fn to_postfix(tokens: &[QueryToken]) -> std::result::Result<Vec<QueryToken>, MalformedQuery> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<QueryToken> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.operator().is_some() && i > 0 && tokens[i - 1] == QueryToken::Not {
            return Err(MalformedQuery::MissingOperand(Operator::Not));
        }
        match token {
            QueryToken::LParen => stack.push(QueryToken::LParen),
            QueryToken::RParen => loop {
                match stack.pop() {
                    Some(QueryToken::LParen) => break,
                    Some(op) => output.push(op),
                    None => return Err(MalformedQuery::UnmatchedClose),
                }
            },
            QueryToken::Operand(_) => output.push(token.clone()),
            op_token => {
                let Some(incoming) = op_token.operator() else { continue };
                while let Some(top) = stack.last().and_then(QueryToken::operator) {
                    if top.precedence() < incoming.precedence() {
                        break;
                    }
                    stack.pop();
                    output.push(top.into());
                }
                stack.push(op_token.clone());
            }
        }
    }

    while let Some(token) = stack.pop() {
        if token == QueryToken::LParen {
            return Err(MalformedQuery::UnclosedOpen);
        }
        output.push(token);
    }
    Ok(output)
}

/// Evaluate a postfix stream. `NOT` complements against every indexed document.
pub fn evaluate(
    postfix: &[QueryToken],
    postings: &Postings,
) -> std::result::Result<BTreeSet<DocId>, MalformedQuery> {
    let mut stack: Vec<BTreeSet<DocId>> = Vec::new();

    for token in postfix {
        if let QueryToken::Operand(lemma) = token {
            stack.push(postings.get(lemma).cloned().unwrap_or_default());
            continue;
        }
        let Some(op) = token.operator() else {
            // brackets never survive `to_postfix`
            return Err(MalformedQuery::UnclosedOpen);
        };
        if stack.len() < op.arity() {
            return Err(MalformedQuery::MissingOperand(op));
        }
        let result = match op {
            Operator::Not => {
                let operand = stack.pop().unwrap_or_default();
                postings.all_documents().difference(&operand).copied().collect()
            }
            Operator::And => {
                let right = stack.pop().unwrap_or_default();
                let left = stack.pop().unwrap_or_default();
                left.intersection(&right).copied().collect()
            }
            Operator::Or => {
                let right = stack.pop().unwrap_or_default();
                let mut left = stack.pop().unwrap_or_default();
                left.extend(right);
                left
            }
        };
        stack.push(result);
    }

    match stack.len() {
        0 => Ok(BTreeSet::new()),
        1 => Ok(stack.pop().unwrap_or_default()),
        _ => Err(MalformedQuery::MissingOperator),
    }
}

/// Boolean search over one postings snapshot.
#[derive(Debug, Clone, Default)]
pub struct BooleanSearch {
    postings: Postings,
    token_lemmas: BTreeMap<String, BTreeSet<String>>,
}

impl BooleanSearch {
    /// `corpus` supplies the token -> lemma lookup used to expand operands.
    pub fn new(postings: Postings, corpus: &Corpus) -> Self {
        let mut token_lemmas: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for doc in corpus.documents() {
            for (lemma, tokens) in &doc.lemma_groups {
                for token in tokens {
                    token_lemmas
                        .entry(token.to_lowercase())
                        .or_default()
                        .insert(lemma.clone());
                }
            }
        }
        Self { postings, token_lemmas }
    }

    pub fn postings(&self) -> &Postings {
        &self.postings
    }

    /// Lemmas a surface token was recorded under.
    pub fn lemmas_for(&self, token: &str) -> Option<&BTreeSet<String>> {
        self.token_lemmas.get(token)
    }

    /// Replace operands with their lemmas. A token recorded under several lemmas
    /// becomes a bracketed OR group; an unknown token stays as typed.
    pub fn expand(&self, tokens: Vec<QueryToken>) -> Vec<QueryToken> {
        let mut expanded = Vec::with_capacity(tokens.len());
        for token in tokens {
            let QueryToken::Operand(word) = token else {
                expanded.push(token);
                continue;
            };
            match self.lemmas_for(&word) {
                Some(lemmas) if lemmas.len() > 1 => {
                    expanded.push(QueryToken::LParen);
                    for (i, lemma) in lemmas.iter().enumerate() {
                        if i > 0 {
                            expanded.push(QueryToken::Or);
                        }
                        expanded.push(QueryToken::operand(lemma.as_str()));
                    }
                    expanded.push(QueryToken::RParen);
                }
                Some(lemmas) => match lemmas.iter().next() {
                    Some(lemma) => expanded.push(QueryToken::operand(lemma.as_str())),
                    None => expanded.push(QueryToken::Operand(word)),
                },
                None => expanded.push(QueryToken::Operand(word)),
            }
        }
        expanded
    }

    /// Lex, expand and convert `query` to postfix.
    pub fn compile(&self, query: &str) -> Result<Vec<QueryToken>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MalformedQuery::Empty.into());
        }
        let tokens = self.expand(lex(query));
        Ok(to_postfix(&tokens)?)
    }

    pub fn search(&self, query: &str) -> Result<BTreeSet<DocId>> {
        let postfix = self.compile(query)?;
        tracing::debug!(
            query,
            postfix = %postfix.iter().map(ToString::to_string).collect::<Vec<_>>().join(" "),
            "compiled boolean query"
        );
        Ok(evaluate(&postfix, &self.postings)?)
    }
}
