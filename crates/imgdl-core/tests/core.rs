use async_trait::async_trait;
use imgdl_core::provider::{ImageProvider, PageCursor, SearchQuery};
use imgdl_core::{ImgdlCore, ImgdlError};
use imgdl_types::{ResultItem, Settings};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Serves `total` items per query, remembering the queries it saw
struct FakeProvider {
    total: usize,
    queries: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new(total: usize) -> Self {
        Self {
            total,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        cursor: &mut PageCursor,
    ) -> Result<Vec<ResultItem>, ImgdlError> {
        self.queries.lock().unwrap().push(query.text.clone());
        let end = (cursor.offset + 25).min(self.total);
        let items = (cursor.offset..end)
            .map(|i| ResultItem::from_image_url(format!("http://img/{}/{}.jpg", query.text, i), "fake"))
            .collect();
        cursor.offset = end;
        cursor.exhausted = end >= self.total;
        Ok(items)
    }
}

async fn core_with(provider: Arc<FakeProvider>) -> (ImgdlCore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        download_dir: dir.path().join("downloads"),
        ..Settings::default()
    };
    let core = ImgdlCore::with_provider(settings, provider).await.unwrap();
    (core, dir)
}

#[tokio::test]
async fn startup_creates_download_directory() {
    let (core, dir) = core_with(Arc::new(FakeProvider::new(0))).await;
    assert!(dir.path().join("downloads").is_dir());
    assert!(core.downloads().download_dir().is_absolute());
}

#[tokio::test]
async fn search_then_more_pages_through_distinct_items() {
    let (core, _dir) = core_with(Arc::new(FakeProvider::new(70))).await;

    let (session_id, first) = core.search("cats", "").await.unwrap();
    let second = core.more(&session_id).await.unwrap();
    let third = core.more(&session_id).await.unwrap();
    let fourth = core.more(&session_id).await.unwrap();

    assert_eq!(first.len(), 30);
    assert_eq!(second.len(), 30);
    assert_eq!(third.len(), 10);
    assert!(fourth.is_empty());

    let unique: HashSet<_> = first.iter().chain(&second).map(|i| &i.image_url).collect();
    assert_eq!(unique.len(), 60);
    assert_eq!(first[0].image_url, "http://img/cats/0.jpg");
    assert_eq!(second[0].image_url, "http://img/cats/30.jpg");
}

#[tokio::test]
async fn resolution_size_rewrites_query() {
    let provider = Arc::new(FakeProvider::new(5));
    let (core, _dir) = core_with(provider.clone()).await;

    core.search("mountains", "2k").await.unwrap();
    assert_eq!(
        provider.queries.lock().unwrap().first().map(String::as_str),
        Some("mountains 2k wallpaper")
    );
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let (core, _dir) = core_with(Arc::new(FakeProvider::new(5))).await;

    let err = core.search("   ", "").await.unwrap_err();
    assert!(matches!(err, ImgdlError::Validation(_)));

    let err = core.search("cats", "16k").await.unwrap_err();
    assert!(matches!(err, ImgdlError::Validation(_)));

    let err = core.more("no-such-session").await.unwrap_err();
    assert!(matches!(err, ImgdlError::SessionNotFound(_)));

    let err = core.download_all(&[]).await.unwrap_err();
    assert!(err.is_client_error());

    let err = core.proxy("").await.unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn sessions_are_independent() {
    let (core, _dir) = core_with(Arc::new(FakeProvider::new(40))).await;

    let (cats, _) = core.search("cats", "").await.unwrap();
    let (dogs, dog_results) = core.search("dogs", "").await.unwrap();
    assert_ne!(cats, dogs);
    assert_eq!(dog_results[0].image_url, "http://img/dogs/0.jpg");

    let more_cats = core.more(&cats).await.unwrap();
    assert_eq!(more_cats.len(), 10);
    assert_eq!(more_cats[0].image_url, "http://img/cats/30.jpg");
}
