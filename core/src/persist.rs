use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::NormalizerSettings;
use crate::stats::{TermSpace, TermStatistics, Vocabulary};
use crate::{Corpus, DocId, Document, Error, LemmaGroups, Normalizer, Postings, Result, Snapshot};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    #[serde(default)]
    pub normalizer: NormalizerSettings,
}

/// Output layout of one pipeline run.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn pages_dir(&self) -> PathBuf { self.root.join("pages") }
    pub fn page(&self, id: DocId) -> PathBuf { self.pages_dir().join(format!("{id}.html")) }
    pub fn texts_dir(&self) -> PathBuf { self.root.join("texts") }
    pub fn text(&self, id: DocId) -> PathBuf { self.texts_dir().join(format!("{id}.txt")) }
    pub fn tokens_dir(&self) -> PathBuf { self.root.join("tokens") }
    pub fn tokens(&self, id: DocId) -> PathBuf { self.tokens_dir().join(format!("{id}.txt")) }
    pub fn lemmas_dir(&self) -> PathBuf { self.root.join("lemmas") }
    pub fn lemmas(&self, id: DocId) -> PathBuf { self.lemmas_dir().join(format!("{id}.txt")) }
    pub fn tfidf_dir(&self, vocabulary: Vocabulary) -> PathBuf {
        self.root.join(format!("tfidf_{}s", vocabulary.as_str()))
    }
    pub fn tfidf(&self, vocabulary: Vocabulary, id: DocId) -> PathBuf {
        self.tfidf_dir(vocabulary).join(format!("{id}.txt"))
    }
    pub fn pages_archive(&self) -> PathBuf { self.root.join("pages.tar.gz") }
    pub fn url_index(&self) -> PathBuf { self.root.join("index.txt") }
    pub fn inverted_index(&self) -> PathBuf { self.root.join("inverted_index.txt") }
    pub fn corpus(&self) -> PathBuf { self.root.join("corpus.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    fs::write(path, text)?;
    Ok(())
}

/// `<index> <url>` lines.
pub fn parse_url_index(text: &str, path: &Path) -> Result<BTreeMap<DocId, String>> {
    let mut urls = BTreeMap::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (id, url) = line
            .split_once(' ')
            .ok_or_else(|| Error::listing(path, n + 1, "expected `<index> <url>`"))?;
        let id: DocId = id
            .parse()
            .map_err(|_| Error::listing(path, n + 1, format!("invalid document id `{id}`")))?;
        urls.insert(id, url.trim().to_string());
    }
    Ok(urls)
}

pub fn format_url_index(urls: &BTreeMap<DocId, String>) -> String {
    urls.iter().fold(String::new(), |mut out, (id, url)| {
        let _ = writeln!(out, "{id} {url}");
        out
    })
}

pub fn save_url_index(paths: &IndexPaths, urls: &BTreeMap<DocId, String>) -> Result<()> {
    write_text(&paths.url_index(), &format_url_index(urls))
}

pub fn load_url_index(paths: &IndexPaths) -> Result<BTreeMap<DocId, String>> {
    let path = paths.url_index();
    let text = fs::read_to_string(&path)?;
    parse_url_index(&text, &path)
}

/// `lemma: token1 token2 ...` lines.
pub fn parse_lemma_groups(text: &str, path: &Path) -> Result<LemmaGroups> {
    let mut groups = LemmaGroups::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (lemma, tokens) = line
            .split_once(':')
            .ok_or_else(|| Error::listing(path, n + 1, "expected `lemma: tokens`"))?;
        let tokens: BTreeSet<String> = tokens.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return Err(Error::listing(path, n + 1, "lemma without tokens"));
        }
        groups.entry(lemma.trim().to_string()).or_default().extend(tokens);
    }
    Ok(groups)
}

pub fn format_lemma_groups(groups: &LemmaGroups) -> String {
    groups
        .iter()
        .map(|(lemma, tokens)| {
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            format!("{lemma}: {}", tokens.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text, token and lemma listings of one document.
pub fn save_document(paths: &IndexPaths, doc: &Document) -> Result<()> {
    write_text(&paths.text(doc.id), &doc.text)?;
    write_text(&paths.tokens(doc.id), &doc.tokens.join("\n"))?;
    write_text(&paths.lemmas(doc.id), &format_lemma_groups(&doc.lemma_groups))?;
    Ok(())
}

pub fn load_document(paths: &IndexPaths, id: DocId) -> Result<Document> {
    let lemmas_path = paths.lemmas(id);
    let lemma_groups = parse_lemma_groups(&fs::read_to_string(&lemmas_path)?, &lemmas_path)?;
    let tokens = match fs::read_to_string(paths.tokens(id)) {
        Ok(text) => text.lines().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    let text = match fs::read_to_string(paths.text(id)) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    Ok(Document::new(id, text, tokens, lemma_groups))
}

/// Read every `lemmas/<id>.txt` listing, plus `index.txt` when present.
pub fn load_corpus(paths: &IndexPaths) -> Result<Corpus> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(paths.lemmas_dir())? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        match path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<DocId>().ok()) {
            Some(id) => ids.push(id),
            None => tracing::warn!(path = %path.display(), "skipping listing without a numeric name"),
        }
    }
    ids.sort_unstable();

    let documents = ids
        .into_iter()
        .map(|id| load_document(paths, id))
        .collect::<Result<Vec<_>>>()?;
    let urls = match load_url_index(paths) {
        Ok(urls) => urls,
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(e) => return Err(e),
    };
    Ok(Corpus::from_documents(documents).with_urls(urls))
}

/// `lemma: d1, d2, ...` with lemmas sorted and ids ascending.
pub fn format_inverted_index(postings: &Postings) -> String {
    postings
        .iter()
        .map(|(lemma, docs)| {
            let ids: Vec<String> = docs.iter().map(DocId::to_string).collect();
            format!("{lemma}: {}", ids.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn save_inverted_index(paths: &IndexPaths, postings: &Postings) -> Result<()> {
    write_text(&paths.inverted_index(), &format_inverted_index(postings))
}

/// `<term> <idf> <tfidf>` lines, four decimals each.
pub fn format_tfidf(space: &TermSpace, doc: DocId) -> String {
    space
        .weights(doc)
        .map(|w| format!("{} {:.4} {:.4}", w.term, w.idf, w.tfidf))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One listing per document and vocabulary. Documents without tokens get an empty file.
pub fn save_tfidf(paths: &IndexPaths, corpus: &Corpus, stats: &TermStatistics) -> Result<()> {
    for vocabulary in [Vocabulary::Token, Vocabulary::Lemma] {
        let space = stats.space(vocabulary);
        for id in corpus.ids() {
            write_text(&paths.tfidf(vocabulary, id), &format_tfidf(space, id))?;
        }
    }
    Ok(())
}

pub fn save_corpus(paths: &IndexPaths, corpus: &Corpus) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.corpus())?;
    let bytes = bincode::serialize(corpus)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_corpus_snapshot(paths: &IndexPaths) -> Result<Corpus> {
    let mut f = File::open(paths.corpus())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let corpus = bincode::deserialize(&buf)?;
    Ok(corpus)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Snapshot of a built directory plus the normalizer it was built with. Reads
/// corpus.bin when present and the text listings otherwise.
pub fn open_index(paths: &IndexPaths) -> Result<(Snapshot, Normalizer)> {
    let settings = match load_meta(paths) {
        Ok(meta) => meta.normalizer,
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => NormalizerSettings::default(),
        Err(e) => return Err(e),
    };
    let corpus = if paths.corpus().exists() {
        load_corpus_snapshot(paths)?
    } else {
        load_corpus(paths)?
    };
    Ok((Snapshot::build(corpus), settings.build()?))
}
