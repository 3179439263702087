#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use engine::config::EngineConfig;
use engine::event::Event;
use engine::storage::btree::{LookupError, LookupFsm, LookupResult, TreeBuilder};
use engine::storage::{FileStore, PageCache};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Children per internal node for trees built from the command line.
const BUILD_FANOUT: usize = 128;
/// Entries per leaf for trees built from the command line.
const BUILD_LEAF_CAPACITY: usize = 64;

const USAGE: &str = "usage: engine build <input.tsv> | engine get <key>...";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = EngineConfig::from_env();
    let fallback_filter = config
        .as_ref()
        .map_or(EngineConfig::DEFAULT_LOG_FILTER, |config| {
            config.log_filter.as_str()
        })
        .to_string();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: data_file={}, cache_pages={}",
        config.data_file.display(),
        config.cache_pages
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.split_first() {
        Some((command, [input])) if command == "build" => build(&config, Path::new(input)).await,
        Some((command, keys)) if command == "get" && !keys.is_empty() => get(&config, keys).await,
        _ => {
            tracing::error!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Parse `key<TAB>value` lines into sorted entries. Blank lines are skipped;
/// a repeated key keeps its last value.
fn parse_entries(text: &str) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, String> {
    let mut entries = BTreeMap::new();
    for (index, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('\t') else {
            return Err(format!("line {}: expected key<TAB>value", index + 1));
        };
        if entries
            .insert(key.as_bytes().to_vec(), value.as_bytes().to_vec())
            .is_some()
        {
            tracing::warn!(line = index + 1, key, "duplicate key, keeping the later value");
        }
    }
    Ok(entries)
}

async fn build(config: &EngineConfig, input: &Path) -> Result<(), Box<dyn Error>> {
    let text = tokio::fs::read_to_string(input).await?;
    let entries = parse_entries(&text)?;
    let tree = TreeBuilder::new(BUILD_FANOUT, BUILD_LEAF_CAPACITY).build(entries)?;

    let (depth, entry_count, pages) = (tree.depth, tree.entry_count, tree.pages.len());
    let path = config.data_file.clone();
    tokio::task::spawn_blocking(move || tree.write_to_file(&path)).await??;

    tracing::info!(
        path = %config.data_file.display(),
        entries = entry_count,
        depth,
        pages,
        "tree written"
    );
    Ok(())
}

/// A lookup and whatever stopped it early.
struct Request<'c> {
    key: &'c str,
    fsm: LookupFsm<'c, PageCache<FileStore>>,
    error: Option<LookupError>,
}

impl Request<'_> {
    fn is_waiting(&self) -> bool {
        self.error.is_none() && !self.fsm.is_complete()
    }

    fn advance(&mut self, event: Option<&Event>) {
        if let Err(e) = self.fsm.advance(event) {
            tracing::warn!(key = self.key, error = %e, "lookup failed");
            self.error = Some(e);
        }
    }
}

/// Run one lookup per key over a shared cache. Fetches are completed on the
/// blocking pool; the event loop only ever runs FSM steps.
#[allow(clippy::disallowed_methods)] // Arc::clone is required for shared ownership
async fn get(config: &EngineConfig, keys: &[String]) -> Result<(), Box<dyn Error>> {
    let path = config.data_file.clone();
    let store = tokio::task::spawn_blocking(move || FileStore::open(&path)).await??;
    let cache = Arc::new(PageCache::new(store, config.cache_pages));

    let mut requests = Vec::with_capacity(keys.len());
    for key in keys {
        requests.push(Request {
            key,
            fsm: LookupFsm::init_lookup(&*cache, key.as_bytes())?,
            error: None,
        });
    }

    for request in &mut requests {
        request.advance(None);
    }

    while requests.iter().any(Request::is_waiting) {
        let completer = Arc::clone(&cache);
        let events = tokio::task::spawn_blocking(move || completer.complete_pending()).await?;
        if events.is_empty() {
            return Err("lookups waiting with no fetch outstanding".into());
        }

        for event in &events {
            let Event::PageReady(page_id) = *event else {
                continue;
            };
            for request in requests
                .iter_mut()
                .filter(|r| r.is_waiting() && r.fsm.outstanding() == Some(page_id))
            {
                request.advance(Some(event));
            }
        }
    }

    let mut failed = 0;
    for request in requests {
        match (request.error, request.fsm.into_result()) {
            (None, Some(LookupResult::Found(value))) => {
                println!("{}\t{}", request.key, String::from_utf8_lossy(&value));
            }
            (None, Some(LookupResult::NotFound)) => println!("{}\t(not found)", request.key),
            (error, result) => {
                failed += 1;
                tracing::error!(key = request.key, ?error, ?result, "lookup did not finish");
            }
        }
    }

    tracing::debug!(
        stats = ?cache.stats(),
        peak_resident = cache.peak_resident(),
        "lookups complete"
    );
    if failed > 0 {
        return Err(format!("{failed} of {} lookups failed", keys.len()).into());
    }
    Ok(())
}
