use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tracing::warn;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Anything that can hand back the body of a page.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// `None` means the page is unavailable; the caller moves on.
    async fn get(&self, url: &str) -> Option<String>;
}

pub struct HttpFetcher {
    client: Client,
    retries: u32,
    delay: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retries: u32, delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;
        Ok(Self { client, retries, delay })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, String> {
        let res = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        if res.status() != StatusCode::OK {
            return Err(format!("status {}", res.status()));
        }
        res.text().await.map_err(|e| e.to_string())
    }
}

impl PageSource for HttpFetcher {
    async fn get(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.retries {
            match self.fetch_once(url).await {
                Ok(body) => return Some(body),
                Err(e) if attempt < self.retries => {
                    warn!("Error {} fetching {}. Retrying... ({}/{})", e, url, attempt, self.retries);
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => warn!("Error {} fetching {} ({}/{})", e, url, attempt, self.retries),
            }
        }
        warn!("Could not fetch {} after {} attempts", url, self.retries);
        None
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one response per connection, answering with `statuses` in
    /// order and repeating the last one. Returns the url and a request count.
    async fn serve(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses[n.min(statuses.len() - 1)];

                let mut req = Vec::new();
                let mut chunk = [0u8; 1024];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => req.extend_from_slice(&chunk[..read]),
                    }
                }

                let body = if status == 200 { "<html>ok</html>" } else { "busy" };
                let res = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(res.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/propiedades/?page=1", addr), hits)
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), 3, Duration::ZERO).unwrap()
    }

    #[tokio::test]
    async fn non_200_is_retried_until_success() {
        let (url, hits) = serve(vec![503, 200]).await;
        assert_eq!(fetcher().get(&url).await.as_deref(), Some("<html>ok</html>"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_every_attempt_fails() {
        let (url, hits) = serve(vec![503]).await;
        assert_eq!(fetcher().get(&url).await, None);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transport_errors_are_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert_eq!(fetcher().get(&format!("http://{}/", addr)).await, None);
    }

    #[tokio::test]
    async fn no_delay_after_the_last_attempt() {
        let (url, hits) = serve(vec![503]).await;
        let slow = HttpFetcher::new(Duration::from_secs(5), 2, Duration::from_millis(300)).unwrap();
        let t0 = Instant::now();
        assert_eq!(slow.get(&url).await, None);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(t0.elapsed() < Duration::from_millis(550), "{:?}", t0.elapsed());
    }
}
