use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use lexis_core::persist::{save_url_index, IndexPaths};
use lexis_core::DocId;
use reqwest::{header, Client, Url};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "lexis-crawler")]
#[command(about = "Download a fixed list of pages into pages/<n>.html and index.txt")]
struct Cli {
    /// File with one URL per line; a URL's position in the list is its page number
    #[arg(long)]
    urls: String,
    /// Pipeline directory to write pages/ and index.txt into
    #[arg(long, default_value = "./output")]
    output: String,
    /// Concurrency (number of simultaneous downloads)
    #[arg(long, default_value_t = 16)]
    concurrency: usize,
    /// Attempts per URL before giving up
    #[arg(long, default_value_t = 3)]
    attempts: u32,
    /// Delay between attempts, milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    #[arg(long, default_value = "lexis-crawler/0.1")]
    user_agent: String,
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let list = fs::read_to_string(&args.urls).with_context(|| format!("reading {}", args.urls))?;
    let urls = parse_url_list(&list);
    if urls.is_empty() {
        bail!("no valid URLs in {}", args.urls);
    }

    let paths = IndexPaths::new(&args.output);
    fs::create_dir_all(paths.pages_dir())?;
    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let policy = RetryPolicy { attempts: args.attempts.max(1), delay: Duration::from_millis(args.retry_delay_ms) };
    tracing::info!(urls = urls.len(), concurrency = args.concurrency, output = %args.output, "crawl started");

    let permits = Arc::new(Semaphore::new(args.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (id, url) in urls {
        let client = client.clone();
        let permits = permits.clone();
        let page = paths.page(id);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let body = fetch_with_retry(&client, &url, policy).await?;
            tokio::fs::write(&page, body).await.with_context(|| format!("writing {}", page.display()))?;
            tracing::info!(id, %url, "downloaded");
            Ok::<_, anyhow::Error>((id, url))
        });
    }

    let mut fetched = BTreeMap::new();
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok((id, url)) => {
                fetched.insert(id, url.to_string());
            }
            Err(e) => {
                failed += 1;
                tracing::error!("{e:#}");
            }
        }
    }

    save_url_index(&paths, &fetched)?;
    let archive = archive_pages(&paths, fetched.keys().copied())?;
    tracing::info!(
        fetched = fetched.len(),
        failed,
        index = %paths.url_index().display(),
        archive = %archive.display(),
        "crawl finished"
    );
    Ok(())
}

/// Pack the given pages into `pages.tar.gz` as `pages/<n>.html`.
fn archive_pages(paths: &IndexPaths, ids: impl IntoIterator<Item = DocId>) -> Result<PathBuf> {
    let archive = paths.pages_archive();
    let file = File::create(&archive).with_context(|| format!("creating {}", archive.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(BufWriter::new(file), Compression::default()));
    for id in ids {
        builder
            .append_path_with_name(paths.page(id), format!("pages/{id}.html"))
            .with_context(|| format!("archiving page {id}"))?;
    }
    builder.into_inner()?.finish()?.flush()?;
    Ok(archive)
}

/// Numbers URLs by their 1-based position among the non-blank, non-comment lines.
/// Unparseable lines keep their number so the remaining ids stay stable.
fn parse_url_list(text: &str) -> Vec<(DocId, Url)> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .zip(1..)
        .filter_map(|(line, id)| match parse_url(line) {
            Some(url) => Some((id, url)),
            None => {
                tracing::warn!(id, line, "skipping invalid URL");
                None
            }
        })
        .collect()
}

fn parse_url(s: &str) -> Option<Url> {
    let url = Url::parse(s).or_else(|_| Url::parse(&format!("https://{s}"))).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

async fn fetch_with_retry(client: &Client, url: &Url, policy: RetryPolicy) -> Result<Vec<u8>> {
    let mut attempt = 1;
    loop {
        match fetch_page(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) if attempt < policy.attempts => {
                tracing::warn!(%url, attempt, max = policy.attempts, "download failed: {e:#}");
                sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.context(format!("giving up on {url} after {attempt} attempts"))),
        }
    }
}

async fn fetch_page(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let resp = client.get(url.clone()).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("status {status}"));
    }
    let content_type = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    check_content_type(content_type)?;
    let bytes = resp.bytes().await?;
    check_size(bytes.len())?;
    Ok(bytes.to_vec())
}

/// Missing headers are accepted; anything present must be HTML.
fn check_content_type(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(v) if !v.trim_start().to_ascii_lowercase().starts_with("text/html") => {
            Err(anyhow!("not an HTML page: {v}"))
        }
        _ => Ok(()),
    }
}

fn check_size(len: usize) -> Result<()> {
    if len > MAX_PAGE_BYTES {
        bail!("page too large: {len} bytes");
    }
    Ok(())
}
