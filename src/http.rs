use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const CACHE_DIR: &str = "matchday_audience";
const CACHE_FILE: &str = "http_cache.json";
const CACHE_VERSION: u32 = 1;

static CLIENT: OnceCell<Client> = OnceCell::new();
static STORE: Mutex<Option<CacheStore>> = Mutex::new(None);

pub fn client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheStore {
    version: u32,
    bodies: HashMap<String, CachedBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedBody {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

/// GET `url` as text, revalidating against any cached copy. A `304 Not
/// Modified` answer reuses the stored body.
pub fn get_text_cached(url: &str) -> Result<String> {
    let client = client()?;
    let cached = with_store(|store| store.bodies.get(url).cloned());

    let mut req = client
        .get(url)
        .header(USER_AGENT, "matchday-audience/0.1")
        .header(ACCEPT, "application/json, text/plain, */*");
    if let Some(entry) = &cached {
        if let Some(etag) = &entry.etag {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &entry.last_modified {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request to {url} failed"))?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        let entry = cached.ok_or_else(|| anyhow!("304 from {url} without a cached body"))?;
        debug!(url, "http cache hit (304)");
        return Ok(entry.body);
    }

    let header_text = |name: HeaderName| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let etag = header_text(ETAG);
    let last_modified = header_text(LAST_MODIFIED);

    let body = resp.text().with_context(|| format!("reading body from {url}"))?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}"));
    }

    let entry = CachedBody {
        body: body.clone(),
        etag,
        last_modified,
        fetched_at: Utc::now().timestamp(),
    };
    with_store(|store| {
        store.version = CACHE_VERSION;
        store.bodies.insert(url.to_string(), entry);
        if let Err(err) = save_store(store) {
            debug!(error = %err, "http cache not saved");
        }
    });
    Ok(body)
}

fn with_store<T>(action: impl FnOnce(&mut CacheStore) -> T) -> T {
    let mut guard = STORE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let store = guard.get_or_insert_with(load_store);
    action(store)
}

fn load_store() -> CacheStore {
    let Some(raw) = store_path().and_then(|path| fs::read_to_string(path).ok()) else {
        return CacheStore::default();
    };
    match serde_json::from_str::<CacheStore>(&raw) {
        Ok(store) if store.version == CACHE_VERSION => store,
        _ => CacheStore::default(),
    }
}

fn save_store(store: &CacheStore) -> Result<()> {
    let Some(path) = store_path() else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("create http cache dir")?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(store).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

/// `$XDG_CACHE_HOME/matchday_audience/http_cache.json`, else under `~/.cache`.
fn store_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CACHE_HOME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|home| PathBuf::from(home).join(".cache"))
        })?;
    Some(base.join(CACHE_DIR).join(CACHE_FILE))
}
