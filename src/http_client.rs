use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// Desktop browser user agents, one picked per client
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// The fetch primitive every adapter goes through.
///
/// Any non-2xx status or transport failure is reported as
/// [`TrackerError::Fetch`]; adapters treat that as "page unavailable".
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get_url(&self, url: &str, headers: &HeaderMap) -> Result<Vec<u8>>;

    /// Form-encoded POST, used by themes that load chapter lists over AJAX.
    async fn post_form(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &[(&str, &str)],
    ) -> Result<Vec<u8>>;
}

/// Timeouts and retry policy for [`EnhancedHttpClient`]
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub enable_cookies: bool,
    pub enable_gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            enable_cookies: true,
            enable_gzip: true,
        }
    }
}

/// reqwest-backed [`Fetch`] with retries, backoff and user agent rotation.
pub struct EnhancedHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl EnhancedHttpClient {
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> std::result::Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(Self::random_user_agent())
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_gzip)
            .brotli(config.enable_gzip)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    /// Exponential backoff capped at `max_retry_delay_ms`, with ±25% jitter.
    fn calculate_retry_delay(&self, attempt: usize) -> Duration {
        let base_delay = self.config.initial_retry_delay_ms;
        let delay_ms = base_delay
            .saturating_mul(2u64.saturating_pow(attempt as u32))
            .min(self.config.max_retry_delay_ms);

        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        matches!(
            status.as_u16(),
            429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524 | 525 | 526 | 527
        )
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error: Option<TrackerError> = None;

        for attempt in 0..=self.config.max_retries {
            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "Received retryable status {} for {}, attempt {}/{}",
                            status,
                            url,
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        sleep(self.calculate_retry_delay(attempt)).await;
                        last_error = Some(TrackerError::fetch(url, status));
                        continue;
                    }
                    if !status.is_success() {
                        return Err(TrackerError::fetch(url, status));
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let should_retry = e.is_timeout() || e.is_connect() || e.is_request();
                    if should_retry && attempt < self.config.max_retries {
                        log::warn!(
                            "Request failed for {}, attempt {}/{}: {}",
                            url,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                        sleep(self.calculate_retry_delay(attempt)).await;
                        last_error = Some(TrackerError::fetch(url, &e));
                        continue;
                    }
                    return Err(TrackerError::fetch(url, e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TrackerError::fetch(url, "retries exhausted")))
    }

    async fn read_body(url: &str, response: Response) -> Result<Vec<u8>> {
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TrackerError::fetch(url, e))
    }
}

#[async_trait]
impl Fetch for EnhancedHttpClient {
    async fn get_url(&self, url: &str, headers: &HeaderMap) -> Result<Vec<u8>> {
        let response = self
            .send_with_retry(url, || {
                let mut request = self.client.get(url).headers(headers.clone());
                if !headers.contains_key(USER_AGENT) {
                    request = request.header(USER_AGENT, Self::random_user_agent());
                }
                request
            })
            .await?;
        Self::read_body(url, response).await
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &[(&str, &str)],
    ) -> Result<Vec<u8>> {
        // POST is not retried; single attempt
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| TrackerError::fetch(url, e))?;
        if !response.status().is_success() {
            return Err(TrackerError::fetch(url, response.status()));
        }
        Self::read_body(url, response).await
    }
}

/// In-memory [`Fetch`] serving canned bodies keyed by URL.
///
/// Unknown URLs answer with a 404-style fetch error. Used to replay saved
/// pages offline and in tests.
#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.into(), body.into());
        }
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn serve(&self, url: &str) -> Result<Vec<u8>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.pages
            .lock()
            .ok()
            .and_then(|pages| pages.get(url).cloned())
            .ok_or_else(|| TrackerError::fetch(url, "404 Not Found"))
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn get_url(&self, url: &str, _headers: &HeaderMap) -> Result<Vec<u8>> {
        self.serve(url)
    }

    async fn post_form(
        &self,
        url: &str,
        _headers: &HeaderMap,
        _form: &[(&str, &str)],
    ) -> Result<Vec<u8>> {
        self.serve(url)
    }
}
