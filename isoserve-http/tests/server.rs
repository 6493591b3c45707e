use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use isoserve_core::{Error, Lifecycle, ServerConfig, ShutdownHandle};
use isoserve_http::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

const WASM_BYTES: &[u8] = &[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0xff, 0x10];

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    task: JoinHandle<isoserve_core::Result<()>>,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        tokio::time::timeout(Duration::from_secs(5), self.shutdown.shutdown())
            .await
            .expect("shutdown timed out");
        self.task.await.unwrap().unwrap();
    }
}

fn start(root: &Path, port: u16) -> Running {
    let config = ServerConfig::default().with_port(port).with_root(root);
    let server = Server::bind(&config).unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let task = tokio::spawn(server.run());
    Running { addr, shutdown, task }
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<script src=\"app.js\"></script>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
    std::fs::write(dir.path().join("app.wasm"), WASM_BYTES).unwrap();
    std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
    std::fs::write(dir.path().join("data.json"), "{\"a\":1}").unwrap();
    dir
}

fn assert_isolated(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["cross-origin-embedder-policy"], "require-corp");
    assert_eq!(headers["cross-origin-opener-policy"], "same-origin");
}

#[tokio::test]
async fn test_get_returns_exact_bytes() {
    let dir = site();
    let server = start(dir.path(), 0);

    let response = reqwest::get(server.url("/app.wasm")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_isolated(&response);
    assert_eq!(response.headers()["content-type"], "application/wasm");
    assert_eq!(response.bytes().await.unwrap().as_ref(), WASM_BYTES);

    server.stop().await;
}

#[tokio::test]
async fn test_missing_file_still_isolated() {
    let dir = site();
    let server = start(dir.path(), 0);

    let response = reqwest::get(server.url("/does/not/exist.js")).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_isolated(&response);

    server.stop().await;
}

#[tokio::test]
async fn test_other_statuses_isolated() {
    let dir = site();
    let server = start(dir.path(), 0);
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let response = client.head(server.url("/app.js")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-length"], "18");
    assert_isolated(&response);

    let response = client.post(server.url("/app.js")).body("x").send().await.unwrap();
    assert_eq!(response.status(), 501);
    assert_isolated(&response);

    let last_modified = client
        .get(server.url("/style.css"))
        .send()
        .await
        .unwrap()
        .headers()["last-modified"]
        .clone();
    let response = client
        .get(server.url("/style.css"))
        .header("If-Modified-Since", last_modified)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 304);
    assert_isolated(&response);

    std::fs::create_dir(dir.path().join("pkg")).unwrap();
    let response = client.get(server.url("/pkg")).send().await.unwrap();
    assert_eq!(response.status(), 301);
    assert_eq!(response.headers()["location"], "/pkg/");
    assert_isolated(&response);

    server.stop().await;
}

#[tokio::test]
async fn test_parent_paths_do_not_escape_root() {
    let outer = tempfile::tempdir().unwrap();
    std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
    let root = outer.path().join("www");
    std::fs::create_dir(&root).unwrap();
    let server = start(&root, 0);

    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /../secret.txt HTTP/1.0\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8_lossy(&raw);
    assert!(raw.contains(" 404 "), "{}", raw);
    assert!(!raw.contains("\r\n\r\nsecret"));

    server.stop().await;
}

#[tokio::test]
async fn test_parallel_asset_fan_out() {
    let dir = site();
    let server = start(dir.path(), 0);
    let client = reqwest::Client::new();

    let paths = ["/", "/index.html", "/app.js", "/app.wasm", "/style.css", "/data.json"];
    let requests = paths.iter().cycle().take(24).map(|path| {
        let client = client.clone();
        let url = server.url(path);
        tokio::spawn(async move { client.get(url).send().await.map(|r| r.status()) })
    });

    for request in requests.collect::<Vec<_>>() {
        assert_eq!(request.await.unwrap().unwrap(), 200);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_without_traffic() {
    let dir = site();
    let server = start(dir.path(), 0);
    let addr = server.addr;
    let shutdown = server.shutdown.clone();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(shutdown.state(), Lifecycle::Running);

    // Shut down from a separate task, like the signal watcher does.
    let stopper = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.shutdown().await }
    });
    tokio::time::timeout(Duration::from_secs(5), stopper)
        .await
        .expect("shutdown deadlocked")
        .unwrap();

    assert_eq!(shutdown.state(), Lifecycle::Stopped);
    server.task.await.unwrap().unwrap();
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_repeated_shutdown_requests() {
    let dir = site();
    let server = start(dir.path(), 0);

    assert!(server.shutdown.request());
    assert!(!server.shutdown.request());
    let again = server.shutdown.clone();
    server.stop().await;
    assert!(!again.request());
    again.shutdown().await;
    assert_eq!(again.state(), Lifecycle::Stopped);
}

#[tokio::test]
async fn test_shutdown_before_run() {
    let dir = site();
    let config = ServerConfig::default().with_port(0).with_root(dir.path());
    let server = Server::bind(&config).unwrap();
    let shutdown = server.shutdown_handle();
    shutdown.request();

    tokio::time::timeout(Duration::from_secs(1), server.run())
        .await
        .expect("run should return immediately")
        .unwrap();
    assert_eq!(shutdown.state(), Lifecycle::Stopped);
}

#[tokio::test]
async fn test_rebind_immediately_after_shutdown() {
    let dir = site();
    let first = start(dir.path(), 0);
    let port = first.addr.port();

    // Leave a connection behind so the old socket lingers.
    reqwest::get(first.url("/app.js")).await.unwrap();
    first.stop().await;

    let second = start(dir.path(), port);
    let response = reqwest::get(second.url("/app.js")).await.unwrap();
    assert_eq!(response.status(), 200);
    second.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let dir = site();
    let first = start(dir.path(), 0);

    let config = ServerConfig::default()
        .with_port(first.addr.port())
        .with_root(dir.path());
    match Server::bind(&config) {
        Err(Error::Bind { addr, .. }) => assert_eq!(addr.port(), first.addr.port()),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("second bind on a listening port succeeded"),
    }

    first.stop().await;
}

#[tokio::test]
async fn test_root_reports_configured_directory() {
    let dir = site();
    let config = ServerConfig::default().with_port(0).with_root(dir.path());
    let server = Server::bind(&config).unwrap();
    assert_eq!(server.root(), dir.path());
}

#[tokio::test]
async fn test_nul_in_path_is_isolated_404() {
    let dir = site();
    let server = start(dir.path(), 0);

    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /%00 HTTP/1.0\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8_lossy(&raw).to_ascii_lowercase();
    assert!(raw.contains(" 404 "), "{}", raw);
    assert!(raw.contains("cross-origin-embedder-policy: require-corp"), "{}", raw);

    server.stop().await;
}

#[tokio::test]
async fn test_large_file_streams_with_exact_length() {
    let dir = site();
    let content: Vec<u8> = (0..3_000_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(dir.path().join("big.wasm"), &content).unwrap();
    let server = start(dir.path(), 0);

    let response = reqwest::get(server.url("/big.wasm")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-length"], "3000000");
    assert_isolated(&response);
    assert_eq!(response.bytes().await.unwrap().as_ref(), content.as_slice());

    server.stop().await;
}

/// hyper answers an unparsable request line itself and closes the
/// connection; that reply never reaches the responder, so it carries no
/// isolation headers.
#[tokio::test]
async fn test_malformed_request_line_gets_400_and_close() {
    let dir = site();
    let server = start(dir.path(), 0);

    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GARBAGE LINE\r\n\r\n").await.unwrap();
    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .expect("connection was not closed")
        .unwrap();
    let raw = String::from_utf8_lossy(&raw);
    assert!(raw.starts_with("HTTP/1.1 400"), "{}", raw);

    // The server keeps accepting afterwards.
    let response = reqwest::get(server.url("/app.js")).await.unwrap();
    assert_eq!(response.status(), 200);

    server.stop().await;
}
