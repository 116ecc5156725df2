use futures::TryStreamExt;
use imgdl_core::{build_client, DownloadDispatcher, ImgdlError, ProxyStreamer};
use imgdl_types::{OutcomeStatus, Settings};
use reqwest::Client;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Raw upstream that sends `body` one byte at a time, pausing `gap` between bytes
async fn trickle_server(body: &'static [u8], gap: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for byte in body {
                    tokio::time::sleep(gap).await;
                    if socket.write_all(&[*byte]).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                }
            });
        }
    });

    addr
}

fn one_second_client() -> Client {
    build_client(&Settings {
        fetch_timeout_secs: 1,
        ..Settings::default()
    })
    .unwrap()
}

async fn image_server() -> MockServer {
    let server = MockServer::start().await;
    for (route, body) in [("/a.jpg", "aaaa"), ("/b.png", "bbbb"), ("/c", "cccc"), ("/gallery/", "dddd")] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "image/jpeg"))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn duplicate_urls_get_distinct_files() {
    let server = image_server().await;
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = DownloadDispatcher::new(Client::new(), dir.path().to_path_buf(), 5);

    let url = format!("{}/a.jpg", server.uri());
    let outcomes = dispatcher.download_all(&[url.clone(), url.clone()]).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Success));

    let first = outcomes[0].saved_path.clone().unwrap();
    let second = outcomes[1].saved_path.clone().unwrap();
    assert_ne!(first, second);

    let mut names: Vec<_> = [&first, &second]
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.jpg".to_string(), "a_1.jpg".to_string()]);

    assert_eq!(std::fs::read(&first).unwrap(), b"aaaa");
    assert_eq!(std::fs::read(&second).unwrap(), b"aaaa");
}

#[tokio::test]
async fn failures_are_isolated_and_order_is_kept() {
    let server = image_server().await;
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = DownloadDispatcher::new(Client::new(), dir.path().to_path_buf(), 2);

    let urls = vec![
        format!("{}/a.jpg", server.uri()),
        "http://127.0.0.1:1/unreachable.jpg".to_string(),
        format!("{}/b.png", server.uri()),
        format!("{}/missing.jpg", server.uri()),
        format!("{}/c", server.uri()),
    ];
    let outcomes = dispatcher.download_all(&urls).await;

    let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Success,
            OutcomeStatus::Error,
            OutcomeStatus::Success,
            OutcomeStatus::Error,
            OutcomeStatus::Success,
        ]
    );
    for (outcome, url) in outcomes.iter().zip(&urls) {
        assert_eq!(&outcome.url, url);
    }

    assert!(outcomes[3].error_message.as_deref().unwrap().contains("404"));
    assert_eq!(
        outcomes[4].saved_path.as_ref().unwrap().file_name().unwrap(),
        "c.jpg"
    );
    assert!(!dir.path().join("missing.jpg").exists());
    assert!(!dir.path().join("unreachable.jpg").exists());
}

#[tokio::test]
async fn url_without_path_segment_gets_synthesized_name() {
    let server = image_server().await;
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = DownloadDispatcher::new(Client::new(), dir.path().to_path_buf(), 5);

    let outcomes = dispatcher
        .download_all(&[format!("{}/gallery/", server.uri())])
        .await;

    let saved = outcomes[0].saved_path.as_ref().unwrap();
    let name = saved.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("image_"));
    assert!(name.ends_with(".jpg"));
    assert_eq!(std::fs::read(saved).unwrap(), b"dddd");
}

#[tokio::test]
async fn slow_upstream_times_out_per_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
        .mount(&server)
        .await;

    let client = Client::builder()
        .read_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = DownloadDispatcher::new(client, dir.path().to_path_buf(), 5);

    let outcomes = dispatcher
        .download_all(&[
            format!("{}/slow.jpg", server.uri()),
            format!("{}/fast.jpg", server.uri()),
        ])
        .await;

    assert_eq!(outcomes[0].status, OutcomeStatus::Error);
    assert!(outcomes[0]
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Timed out"));
    assert_eq!(outcomes[1].status, OutcomeStatus::Success);
}

#[tokio::test]
async fn slow_but_steady_download_outlasts_fetch_timeout() {
    let addr = trickle_server(b"0123456789", Duration::from_millis(300)).await;
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = DownloadDispatcher::new(one_second_client(), dir.path().to_path_buf(), 1);

    let outcomes = dispatcher
        .download_all(&[format!("http://{}/steady.jpg", addr)])
        .await;

    assert_eq!(outcomes[0].status, OutcomeStatus::Success, "{:?}", outcomes[0]);
    let saved = outcomes[0].saved_path.as_ref().unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), b"0123456789");
}

#[tokio::test]
async fn slow_but_steady_proxy_stream_is_not_truncated() {
    let addr = trickle_server(b"0123456789", Duration::from_millis(300)).await;
    let streamer = ProxyStreamer::new(one_second_client());

    let resource = streamer
        .stream(&format!("http://{}/steady.jpg", addr))
        .await
        .unwrap();
    assert_eq!(resource.content_length, Some(10));

    let chunks: Vec<_> = resource.body.try_collect().await.unwrap();
    let body: Vec<u8> = chunks.into_iter().flat_map(|c| c.to_vec()).collect();
    assert_eq!(body, b"0123456789");
}

#[tokio::test]
async fn proxy_forwards_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos/cat.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"\x89PNG-data".to_vec(), "image/png"))
        .mount(&server)
        .await;

    let streamer = ProxyStreamer::new(Client::new());
    let resource = streamer
        .stream(&format!("{}/photos/cat.png?size=large", server.uri()))
        .await
        .unwrap();

    assert_eq!(resource.content_type, "image/png");
    assert_eq!(resource.filename, "cat.png");

    let chunks: Vec<_> = resource.body.try_collect().await.unwrap();
    let body: Vec<u8> = chunks.into_iter().flat_map(|c| c.to_vec()).collect();
    assert_eq!(body, b"\x89PNG-data");
}

#[tokio::test]
async fn proxy_defaults_content_type_and_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bytes".to_vec()))
        .mount(&server)
        .await;

    let streamer = ProxyStreamer::new(Client::new());
    let resource = streamer.stream(&format!("{}/raw", server.uri())).await.unwrap();

    assert_eq!(resource.content_type, "image/jpeg");
    assert_eq!(resource.filename, "raw.jpg");
}

#[tokio::test]
async fn proxy_fails_on_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let streamer = ProxyStreamer::new(Client::new());
    let err = streamer
        .stream(&format!("{}/gone.jpg", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, ImgdlError::ServerError { status: 410, .. }));

    let err = streamer.stream("not a url").await.unwrap_err();
    assert!(matches!(err, ImgdlError::InvalidUrl(_)));
}
