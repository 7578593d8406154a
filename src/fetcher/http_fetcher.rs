use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect, Client};
use tokio::sync::RwLock;

use crate::app::Result;
use crate::config::RequestConfig;
use crate::domain::{FetchRequest, StrategyId};
use crate::fetcher::{FetchBackend, RawPage};

/// Statuses whose body is treated as the page, even when not 2xx.
pub const TOLERATED_STATUSES: [u16; 6] = [200, 301, 302, 307, 401, 403];

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.6; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/18.0 Safari/605.1.15",
];

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([\w-]+)"#).expect("valid charset regex")
});

/// Lightweight strategy: one pooled reqwest client, created on first use.
pub struct HttpFetcher {
    config: RequestConfig,
    client: RwLock<Option<Client>>,
}

impl HttpFetcher {
    pub fn new(config: RequestConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    fn build_client(config: &RequestConfig) -> Result<Client> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(client)
    }

    async fn client(&self) -> Result<Client> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.client.write().await;
        match guard.as_ref() {
            Some(client) => Ok(client.clone()),
            None => {
                let client = Self::build_client(&self.config)?;
                *guard = Some(client.clone());
                Ok(client)
            }
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        headers.insert(USER_AGENT, HeaderValue::from_static(agent));

        headers
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(RequestConfig::default())
    }
}

#[async_trait]
impl FetchBackend for HttpFetcher {
    fn id(&self) -> StrategyId {
        StrategyId::Request
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn initialize(&self) -> Result<()> {
        self.client().await.map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        self.client.write().await.take();
        Ok(())
    }

    async fn fetch(&self, request: &FetchRequest, budget: Duration) -> Result<RawPage> {
        let client = self.client().await?;

        let response = match client
            .get(&request.url)
            .headers(Self::headers())
            .timeout(budget)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(RawPage::timeout()),
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if !TOLERATED_STATUSES.contains(&status.as_u16()) {
            return Ok(RawPage::Failed(format!(
                "{}:{}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let header_charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Ok(RawPage::timeout()),
            Err(e) => return Err(e.into()),
        };

        Ok(RawPage::Html(decode_body(&body, header_charset.as_deref())))
    }
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&body[..body.len().min(4096)]);
    META_CHARSET.captures(&head).map(|caps| caps[1].to_string())
}

/// Decode with the header charset, else a `<meta charset>`, else UTF-8.
fn decode_body(body: &[u8], header_charset: Option<&str>) -> String {
    let label = header_charset
        .map(str::to_string)
        .or_else(|| sniff_meta_charset(body));

    let encoding = label
        .as_deref()
        .and_then(|l| Encoding::for_label(l.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(body);
    text.trim().to_string()
}
