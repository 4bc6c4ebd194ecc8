//! Test doubles for the deployer: a scripted CDN client, a recording
//! sleeper, a scripted HTML fetcher and a store that refuses writes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use url::Url;

use edgepatch_cdn::{CdnClient, CdnClientRegistry, CdnError, InvalidationResult};
use edgepatch_core::{Opportunity, Site, Suggestion};
use edgepatch_deploy::{
    EdgeDeployer, EngineConfig, FetchError, FetchMode, HtmlFetcher, InMemoryObjectStore,
    ObjectStore, Sleeper, StorageError,
};

pub const BASE_URL: &str = "https://www.example.com/";

pub fn site(edge: serde_json::Value) -> Site {
    serde_json::from_value(json!({"id": "site-1", "baseUrl": BASE_URL, "edge": edge})).unwrap()
}

pub fn at(ms: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub fn heading(id: &str, path: &str, text: &str, updated_ms: i64) -> Suggestion {
    Suggestion::new(
        id,
        json!({
            "path": path,
            "checkType": "heading-empty",
            "recommendedAction": text,
            "transformRules": {"selector": format!("h2#{id}"), "action": "replace"}
        }),
        at(updated_ms),
    )
}

pub fn readability(id: &str, url: &str, op: &str) -> Suggestion {
    Suggestion::new(
        id,
        json!({
            "url": url,
            "originalText": "The aforementioned paradigm is operationalized.",
            "improvedText": "This is how it works.",
            "transformRules": {"selector": "article p", "op": op}
        }),
        at(1_000),
    )
}

pub fn headings_opportunity() -> Opportunity {
    Opportunity::new("opp-1", "headings")
}

/// CDN client that records every call and answers from a script.
pub struct ScriptedCdn {
    pub name: String,
    pub valid: bool,
    pub fail: bool,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedCdn {
    pub fn new(name: &str, valid: bool, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            valid,
            fail,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CdnClient for ScriptedCdn {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> bool {
        self.valid
    }

    async fn invalidate_cache(&self, paths: &[String]) -> Result<InvalidationResult, CdnError> {
        self.calls.lock().push(paths.to_vec());
        if self.fail {
            return Err(CdnError::Rejected {
                provider: self.name.clone(),
                message: "purge quota exceeded".into(),
            });
        }
        Ok(InvalidationResult::success(
            self.name.clone(),
            edgepatch_cdn::normalize_paths(paths),
            Some(format!("{}-purge", self.name)),
            Some(1),
        ))
    }
}

/// Registry serving the given scripted clients.
pub fn cdn_registry(clients: &[Arc<ScriptedCdn>]) -> CdnClientRegistry {
    let mut registry = CdnClientRegistry::new();
    for client in clients {
        let client = client.clone();
        registry.register(client.name.clone(), move |_| Ok(client.clone() as Arc<dyn CdnClient>));
    }
    registry
}

/// Sleeper that records requested durations and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept_ms(&self) -> Vec<u64> {
        self.slept.lock().iter().map(|d| d.as_millis() as u64).collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// Sleeper that never wakes; only cancellation ends the wait.
pub struct StuckSleeper;

#[async_trait]
impl Sleeper for StuckSleeper {
    async fn sleep(&self, _: Duration) {
        std::future::pending::<()>().await;
    }
}

/// Fetcher returning a fixed original page and a queue of optimized pages.
/// The last optimized page repeats once the queue runs dry.
pub struct ScriptedFetcher {
    pub original: String,
    pub optimized: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<FetchMode>>,
}

impl ScriptedFetcher {
    pub fn new(original: &str, optimized: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            original: original.to_string(),
            optimized: Mutex::new(optimized.iter().map(|s| s.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<FetchMode> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HtmlFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url, mode: &FetchMode) -> Result<String, FetchError> {
        self.requests.lock().push(mode.clone());
        match mode {
            FetchMode::Original => Ok(self.original.clone()),
            FetchMode::Preview { .. } => {
                let mut queue = self.optimized.lock();
                match queue.len() {
                    0 => Err(FetchError::Status {
                        url: url.to_string(),
                        status: 503,
                    }),
                    1 => Ok(queue[0].clone()),
                    _ => Ok(queue.pop_front().unwrap_or_default()),
                }
            }
        }
    }
}

/// Store that serves reads from `inner` and fails every write.
pub struct ReadOnlyStore {
    pub inner: InMemoryObjectStore,
}

#[async_trait]
impl ObjectStore for ReadOnlyStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, _: Vec<u8>) -> Result<String, StorageError> {
        Err(StorageError::Api {
            endpoint: format!("memory://{bucket}/{key}"),
            status: 507,
            body: "insufficient storage".into(),
        })
    }
}

pub struct Harness {
    pub store: InMemoryObjectStore,
    pub sleeper: Arc<RecordingSleeper>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub deployer: EdgeDeployer,
}

/// Deployer over an in-memory store with the given CDN clients, all of
/// which are the engine's default providers.
pub fn harness(clients: &[Arc<ScriptedCdn>], fetcher: Arc<ScriptedFetcher>) -> Harness {
    harness_with(EngineConfig::default(), clients, fetcher)
}

/// Like [`harness`], starting from `config` instead of the defaults.
pub fn harness_with(
    mut config: EngineConfig,
    clients: &[Arc<ScriptedCdn>],
    fetcher: Arc<ScriptedFetcher>,
) -> Harness {
    let store = InMemoryObjectStore::new();
    let sleeper = Arc::new(RecordingSleeper::default());
    config.cdn_providers = clients.iter().map(|c| c.name.clone()).collect();
    let deployer = EdgeDeployer::new(config, Arc::new(store.clone()), fetcher.clone())
        .with_cdn_registry(cdn_registry(clients))
        .with_sleeper(sleeper.clone());
    Harness {
        store,
        sleeper,
        fetcher,
        deployer,
    }
}
