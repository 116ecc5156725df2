//! Search sessions
//!
//! A session is a lazy cursor over one query's results. Sessions live in a
//! bounded cache with idle expiry, and each cursor sits behind its own
//! mutex so pagination on one session is strictly sequential.

use crate::error::ImgdlError;
use crate::provider::{ImageProvider, PageCursor, SearchQuery};
use chrono::{DateTime, Utc};
use imgdl_types::{ResultItem, SizeHint};
use moka::future::Cache;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Pull cursor over a provider's pages
pub struct ResultCursor {
    query: SearchQuery,
    provider: Arc<dyn ImageProvider>,
    page: PageCursor,
    /// Fetched but not yet handed out
    buffer: VecDeque<ResultItem>,
    /// Image URLs already handed out
    seen: HashSet<String>,
}

impl ResultCursor {
    pub fn new(query: SearchQuery, provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            query,
            provider,
            page: PageCursor::default(),
            buffer: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Take up to `count` unseen items, fetching pages as needed.
    ///
    /// Returns fewer than `count` only once the provider is exhausted. On
    /// a provider error the items gathered so far go back to the buffer.
    pub async fn next_batch(&mut self, count: usize) -> Result<Vec<ResultItem>, ImgdlError> {
        let mut batch = Vec::with_capacity(count);

        while batch.len() < count {
            if let Some(item) = self.buffer.pop_front() {
                if self.seen.insert(item.image_url.clone()) {
                    batch.push(item);
                }
                continue;
            }

            if self.page.exhausted {
                break;
            }

            match self.provider.fetch_page(&self.query, &mut self.page).await {
                Ok(items) if items.is_empty() => self.page.exhausted = true,
                Ok(items) => self.buffer.extend(items),
                Err(e) => {
                    for item in batch.into_iter().rev() {
                        self.seen.remove(&item.image_url);
                        self.buffer.push_front(item);
                    }
                    return Err(e);
                }
            }
        }

        Ok(batch)
    }

    pub fn is_exhausted(&self) -> bool {
        self.page.exhausted && self.buffer.is_empty()
    }
}

struct SessionEntry {
    created_at: DateTime<Utc>,
    cursor: Mutex<ResultCursor>,
}

/// Live search sessions keyed by opaque id
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Arc<SessionEntry>>,
    provider: Arc<dyn ImageProvider>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn ImageProvider>, capacity: u64, idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle)
            .eviction_listener(|id: Arc<String>, entry: Arc<SessionEntry>, cause| {
                let age = Utc::now() - entry.created_at;
                debug!(
                    session_id = %id,
                    age_secs = age.num_seconds(),
                    cause = ?cause,
                    "search session evicted"
                );
            })
            .build();

        Self { sessions, provider }
    }

    /// Open a session for `query` and return its id.
    pub async fn create(&self, query: &str, size: SizeHint) -> String {
        let query = SearchQuery::new(query, size);
        let id = Uuid::new_v4().simple().to_string();

        info!(
            session_id = %id,
            query = %query.text,
            provider = self.provider.name(),
            "search session created"
        );

        let entry = SessionEntry {
            created_at: Utc::now(),
            cursor: Mutex::new(ResultCursor::new(query, Arc::clone(&self.provider))),
        };
        self.sessions.insert(id.clone(), Arc::new(entry)).await;

        id
    }

    /// Next page of up to `count` results for session `id`.
    pub async fn next_batch(&self, id: &str, count: usize) -> Result<Vec<ResultItem>, ImgdlError> {
        let entry = self
            .sessions
            .get(id)
            .await
            .ok_or_else(|| ImgdlError::SessionNotFound(id.to_string()))?;

        let mut cursor = entry.cursor.lock().await;
        let batch = cursor.next_batch(count).await?;
        debug!(
            session_id = %id,
            returned = batch.len(),
            exhausted = cursor.is_exhausted(),
            "served result batch"
        );

        Ok(batch)
    }

    /// Drop a session immediately
    pub async fn remove(&self, id: &str) {
        self.sessions.invalidate(id).await;
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.get(id).await.is_some()
    }

    /// Approximate number of live sessions
    pub fn session_count(&self) -> u64 {
        self.sessions.entry_count()
    }

    /// Apply pending evictions now rather than lazily
    pub async fn run_pending_tasks(&self) {
        self.sessions.run_pending_tasks().await;
    }
}
