use pageless_core::{FetchRequest, HttpMethod, IndexRange, LoaderConfig, PagelessError};
use pageless_domain::FillStrategy;
use pageless_runtime::{Fetcher, HttpSource, LoadEvent, MemoryDocument, RangeLoader};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the test server saw of one request.
#[derive(Debug)]
struct Received {
    request_line: String,
    body: String,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

/// Serve exactly one HTTP/1.1 request with `status` and `body`.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        Received {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&buf[header_end..header_end + content_length])
                .to_string(),
        }
    });

    (base, handle)
}

fn items_body(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("<div class='item'>{}</div>\n", i))
        .collect()
}

#[tokio::test]
async fn test_get_sends_range_in_query() {
    let (base, server) = serve_once("200 OK", items_body(41, 3)).await;
    let source = HttpSource::new(&base).unwrap();

    let items = source
        .fetch(FetchRequest::new(&LoaderConfig::default(), 41, 3))
        .await
        .unwrap();

    assert_eq!(
        items,
        vec![
            "<div class='item'>41</div>",
            "<div class='item'>42</div>",
            "<div class='item'>43</div>",
        ]
    );
    let received = server.await.unwrap();
    assert_eq!(received.request_line, "GET /data?start=41&count=3 HTTP/1.1");
    assert!(received.body.is_empty());
}

#[tokio::test]
async fn test_post_sends_encoded_form() {
    let (base, server) = serve_once("200 OK", items_body(5, 2)).await;
    let source = HttpSource::new(&base).unwrap();
    let config = LoaderConfig {
        url: "/rows".to_string(),
        method: HttpMethod::Post,
        start_param_name: "from index".to_string(),
        count_param_name: "limit&max".to_string(),
        ..Default::default()
    };

    let items = source.fetch(FetchRequest::new(&config, 5, 2)).await.unwrap();

    assert_eq!(items.len(), 2);
    let received = server.await.unwrap();
    assert_eq!(received.request_line, "POST /rows HTTP/1.1");
    assert_eq!(received.body, "from+index=5&limit%26max=2");
}

#[tokio::test]
async fn test_error_status_is_fetch_error() {
    let (base, server) = serve_once("500 Internal Server Error", String::new()).await;
    let source = HttpSource::new(&base).unwrap();

    let result = source
        .fetch(FetchRequest::new(&LoaderConfig::default(), 0, 40))
        .await;

    match result {
        Err(e @ PagelessError::Fetch { start: 0, end: 40, .. }) => {
            assert!(e.is_retryable());
            assert!(e.to_string().contains("500"));
        }
        other => panic!("expected a fetch error, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let source = HttpSource::new(&base).unwrap();

    let result = source
        .fetch(FetchRequest::new(&LoaderConfig::default(), 0, 40))
        .await;

    assert!(matches!(result, Err(PagelessError::Fetch { .. })));
}

#[tokio::test]
async fn test_loader_renders_items_from_endpoint() {
    let (base, server) = serve_once("200 OK", items_body(0, 40)).await;
    let source = HttpSource::new(&base).unwrap();
    let doc = MemoryDocument::new(400.0, 20.0);
    let config = LoaderConfig {
        debounce_ms: 0,
        ..Default::default()
    };

    let loader = RangeLoader::mount(config, 1000, source, doc.clone()).unwrap();
    let mut events = loader.subscribe();

    let event = tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("no load completed")
        .unwrap();

    assert_eq!(
        event,
        LoadEvent::Loaded {
            range: IndexRange::new(0, 40),
            strategy: FillStrategy::Head,
            received: 40,
        }
    );
    assert_eq!(doc.items()[39], "<div class='item'>39</div>");
    let received = server.await.unwrap();
    assert_eq!(received.request_line, "GET /data?start=0&count=40 HTTP/1.1");
}
