//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Minimal HTTP/1.1 responder on the loopback interface.
///
/// Connection `n` receives response `n`; once the list is exhausted the
/// last response is repeated.
pub struct TestServer {
    addr: std::net::SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let idx = n.min(responses.len().saturating_sub(1));
                let (status, body) = responses.get(idx).cloned().unwrap_or((204, String::new()));
                tokio::spawn(respond(stream, status, body));
            }
        });

        Self { addr, hits, handle }
    }

    /// A server that accepts connections and never answers.
    pub async fn silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });

        Self { addr, hits, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Number of connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(mut stream: TcpStream, status: u16, body: String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(body.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Wrap content in a page long enough to pass the size floor.
pub fn padded_page(content: &str) -> String {
    format!(
        "<html><head><title>ГПВ</title></head><body>{content}<!-- {} --></body></html>",
        "padding ".repeat(200)
    )
}

/// Build a status row of 48 cells where `off` indices are `light_2`.
pub fn status_cells(off: std::ops::Range<usize>) -> String {
    (0..48)
        .map(|i| {
            let class = if off.contains(&i) { "light_2" } else { "light_1" };
            format!(r#"<td class="{class}"></td>"#)
        })
        .collect()
}

/// A page shaped like the published schedule.
pub fn schedule_page(second_row_off: std::ops::Range<usize>) -> String {
    let body = format!(
        r#"
<div class="gpvinfodetail">
  <b>16 жовтня 2026 року</b> за командою НЕК «Укренерго» застосовуватимуться графіки.
  <div>Години відсутності електропостачання:</div>
  <div>з 00:00 по 06:00 <span>застосовуватиметься</span> в обсязі <b>1</b> черги</div>
  <div>з 18:00 по 23:59 в обсязі <b>0.5</b> черги</div>
</div>
<table class="turnoff-scheduleui-table">
  <thead><tr><th>Черга</th><th>Підчерга</th></tr></thead>
  <tbody>
    <tr><td class="turnoff-scheduleui-table-queue" rowspan="2">1</td><td class="turnoff-scheduleui-table-subqueue">1</td>{}</tr>
    <tr><td class="turnoff-scheduleui-table-subqueue">2</td>{}</tr>
    <tr><td class="turnoff-scheduleui-table-queue">3</td><td class="turnoff-scheduleui-table-subqueue"></td>{}</tr>
  </tbody>
</table>
"#,
        status_cells(0..12),
        status_cells(second_row_off),
        status_cells(12..24),
    );
    padded_page(&body)
}
