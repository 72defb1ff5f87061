use anyhow::Result;
use lexis_core::{Normalizer, Snapshot};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Boolean,
    Vector,
}

/// Read queries line by line until `exit` or end of input.
pub fn run<R: BufRead, W: Write>(
    snapshot: &Snapshot,
    normalizer: &Normalizer,
    mode: SearchMode,
    input: R,
    mut out: W,
) -> Result<()> {
    writeln!(out, "Enter a query (or 'exit' to quit):")?;
    for line in input.lines() {
        let query = line?;
        let query = query.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            writeln!(out, "Error: empty query")?;
            continue;
        }
        match mode {
            SearchMode::Boolean => boolean(snapshot, query, &mut out)?,
            SearchMode::Vector => vector(snapshot, normalizer, query, &mut out)?,
        }
        writeln!(out, "\nEnter a query (or 'exit' to quit):")?;
    }
    writeln!(out, "Bye")?;
    Ok(())
}

fn boolean<W: Write>(snapshot: &Snapshot, query: &str, out: &mut W) -> Result<()> {
    match snapshot.search(query) {
        Ok(docs) if docs.is_empty() => writeln!(out, "Nothing found for '{query}'")?,
        Ok(docs) => {
            writeln!(out, "Found {} documents:", docs.len())?;
            for (i, id) in docs.iter().enumerate() {
                match snapshot.corpus().url(*id) {
                    Some(url) => writeln!(out, "{}. {id} {url}", i + 1)?,
                    None => writeln!(out, "{}. {id}", i + 1)?,
                }
            }
        }
        Err(e) if e.is_malformed_query() => writeln!(out, "Failed to process query: {e}")?,
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn vector<W: Write>(snapshot: &Snapshot, normalizer: &Normalizer, query: &str, out: &mut W) -> Result<()> {
    let ranking = snapshot.rank(query, normalizer);
    if ranking.len() == 0 {
        writeln!(out, "Nothing found for '{query}'")?;
        return Ok(());
    }
    for (i, hit) in ranking.enumerate() {
        let id = hit.doc_id.to_string();
        let name = snapshot.corpus().url(hit.doc_id).unwrap_or(&id);
        writeln!(out, "{}. {name} ({:.4})", i + 1, hit.score)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_core::config::NormalizerConfig;
    use lexis_core::tokenizer::DictionaryLemmatizer;
    use lexis_core::Corpus;
    use std::collections::BTreeMap;

    fn setup() -> (Snapshot, Normalizer) {
        let normalizer = Normalizer::new(NormalizerConfig::default(), Box::new(DictionaryLemmatizer::default()));
        let mut urls = BTreeMap::new();
        urls.insert(1, "https://a.example".to_string());
        let corpus = Corpus::from_documents(vec![
            normalizer.normalize(1, "кот собака"),
            normalizer.normalize(2, "кот"),
        ])
        .with_urls(urls);
        (Snapshot::build(corpus), normalizer)
    }

    fn session(mode: SearchMode, input: &str) -> String {
        let (snapshot, normalizer) = setup();
        let mut out = Vec::new();
        run(&snapshot, &normalizer, mode, input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn boolean_session() {
        let out = session(SearchMode::Boolean, "кот\n\nжираф\n(кот\nexit\nсобака\n");
        assert!(out.contains("Found 2 documents:\n1. 1 https://a.example\n2. 2\n"));
        assert!(out.contains("Error: empty query"));
        assert!(out.contains("Nothing found for 'жираф'"));
        assert!(out.contains("Failed to process query: malformed query: opening bracket is never closed"));
        assert!(!out.contains("Found 1 documents"));
        assert!(out.ends_with("Bye\n"));
    }

    #[test]
    fn vector_session() {
        let out = session(SearchMode::Vector, "собака\nи на\n");
        assert!(out.contains("1. https://a.example (1.0000)"));
        assert!(out.contains("Nothing found for 'и на'"));
    }
}
