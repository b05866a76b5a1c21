// Search dispatch seam. The production backend drives the blocking scrape
// client; tests swap in a mock so the handlers can run without a session.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{info, warn};

use xscrape_client::{select_provider, Credentials, SearchClient, SearchInput};

/// Runs one search call. Called from a blocking worker thread, so
/// implementations stay synchronous.
pub trait SearchBackend: Send + Sync {
    fn run_search(
        &self,
        queries: &[SearchInput],
        limit: u32,
        retries: u32,
    ) -> anyhow::Result<Vec<Vec<Value>>>;
}

/// Backend over the scrape client. A fresh session is acquired per call
/// unless caching is enabled, in which case the constructed client is
/// reused until a search fails.
pub struct ScraperBackend {
    credentials: Credentials,
    session_dir: PathBuf,
    cache_client: bool,
    cached: Mutex<Option<Arc<SearchClient>>>,
}

impl ScraperBackend {
    pub fn new(
        credentials: Credentials,
        session_dir: impl Into<PathBuf>,
        cache_client: bool,
    ) -> Self {
        Self {
            credentials,
            session_dir: session_dir.into(),
            cache_client,
            cached: Mutex::new(None),
        }
    }

    fn acquire_client(&self) -> anyhow::Result<Arc<SearchClient>> {
        if !self.cache_client {
            return Ok(Arc::new(self.build_client()?));
        }
        // Holding the lock while building also serializes concurrent logins.
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }
        let client = Arc::new(self.build_client()?);
        *cached = Some(client.clone());
        Ok(client)
    }

    fn build_client(&self) -> anyhow::Result<SearchClient> {
        let provider = select_provider(&self.session_dir, self.credentials.clone());
        info!(source = provider.describe(), "acquiring search session");
        let session = provider.acquire()?;
        Ok(SearchClient::new(session)?)
    }

    fn invalidate(&self) {
        if !self.cache_client {
            return;
        }
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if cached.take().is_some() {
            warn!("search failed, dropping cached session client");
        }
    }
}

impl SearchBackend for ScraperBackend {
    fn run_search(
        &self,
        queries: &[SearchInput],
        limit: u32,
        retries: u32,
    ) -> anyhow::Result<Vec<Vec<Value>>> {
        let client = self.acquire_client()?;
        match client.run(queries, limit, retries) {
            Ok(batches) => Ok(batches),
            Err(e) => {
                self.invalidate();
                Err(e.into())
            }
        }
    }
}
