use anyhow::{Context, Result};
use lexis_core::config::NormalizerSettings;
use lexis_core::persist::{
    load_corpus, load_url_index, save_corpus, save_document, save_inverted_index, save_meta,
    save_tfidf, IndexPaths, MetaFile, FORMAT_VERSION,
};
use lexis_core::{Corpus, DocId, Document, Postings, TermStatistics, Vocabulary};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use crate::html::visible_text;

/// Ids of `pages/<n>.html`, ascending.
pub fn page_ids(paths: &IndexPaths) -> Result<Vec<DocId>> {
    let dir = paths.pages_dir();
    let mut ids = Vec::new();
    for entry in WalkDir::new(&dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("html") {
            continue;
        }
        match p.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<DocId>().ok()) {
            Some(id) => ids.push(id),
            None => tracing::warn!(path = %p.display(), "skipping page without a numeric name"),
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Remove a derived directory so listings of deleted pages do not survive a rerun.
fn reset_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("clearing {}", dir.display())),
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

/// Normalize every crawled page in parallel and write its listings and meta.json.
/// Listings from an earlier run and a stale corpus.bin are removed first, so the
/// directory only ever describes the pages currently on disk.
pub fn normalize_pages(paths: &IndexPaths, settings: &NormalizerSettings) -> Result<Corpus> {
    let normalizer = settings.build().context("loading normalizer configuration")?;
    let ids = page_ids(paths)?;
    let documents = ids
        .par_iter()
        .map(|&id| -> Result<Document> {
            let page = paths.page(id);
            let html = fs::read_to_string(&page).with_context(|| format!("reading {}", page.display()))?;
            Ok(normalizer.normalize(id, &visible_text(&html)))
        })
        .collect::<Result<Vec<_>>>()?;

    remove_file_if_exists(&paths.corpus())?;
    for dir in [paths.texts_dir(), paths.tokens_dir(), paths.lemmas_dir()] {
        reset_dir(&dir)?;
    }
    for doc in &documents {
        save_document(paths, doc)?;
    }
    let urls = if paths.url_index().exists() { load_url_index(paths)? } else { BTreeMap::new() };
    let corpus = Corpus::from_documents(documents).with_urls(urls);

    let meta = MetaFile {
        num_docs: corpus.len() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
        normalizer: settings.clone(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(num_docs = corpus.len(), "normalized pages");
    Ok(corpus)
}

pub fn write_inverted_index(paths: &IndexPaths) -> Result<()> {
    let corpus = load_corpus(paths)?;
    let postings = Postings::build(&corpus);
    save_inverted_index(paths, &postings)?;
    tracing::info!(num_lemmas = postings.num_lemmas(), path = %paths.inverted_index().display(), "wrote inverted index");
    Ok(())
}

pub fn write_tfidf(paths: &IndexPaths) -> Result<()> {
    let corpus = load_corpus(paths)?;
    tfidf_listings(paths, &corpus)?;
    tracing::info!(num_docs = corpus.len(), "wrote tf-idf listings");
    Ok(())
}

fn tfidf_listings(paths: &IndexPaths, corpus: &Corpus) -> Result<()> {
    for vocabulary in [Vocabulary::Token, Vocabulary::Lemma] {
        reset_dir(&paths.tfidf_dir(vocabulary))?;
    }
    let stats = TermStatistics::compute(corpus);
    save_tfidf(paths, corpus, &stats)?;
    Ok(())
}

pub fn build(paths: &IndexPaths, settings: &NormalizerSettings) -> Result<()> {
    let corpus = normalize_pages(paths, settings)?;
    let postings = Postings::build(&corpus);
    save_inverted_index(paths, &postings)?;
    tfidf_listings(paths, &corpus)?;
    save_corpus(paths, &corpus)?;

    tracing::info!(output = %paths.root.display(), num_lemmas = postings.num_lemmas(), "build complete");
    Ok(())
}
