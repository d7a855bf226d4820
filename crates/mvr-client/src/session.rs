//! HTTP session against the portal: one client, one cookie jar.

use crate::error::{ClientError, Result};
use mvr_core::ClientConfig;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

/// Cookie store that can be emptied without rebuilding the HTTP client.
#[derive(Default)]
struct SessionCookies(RwLock<Jar>);

impl SessionCookies {
    fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Jar::default();
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cookies(url)
    }
}

/// Cookies and browser-like headers for one logical session with the portal.
pub struct HttpSession {
    client: Client,
    cookies: Arc<SessionCookies>,
    base_url: Url,
    service_url: Url,
}

impl HttpSession {
    /// Create a session for the configured portal.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)?;
        let service_url = base_url.join(&config.service_path)?;
        let cookies = Arc::new(SessionCookies::default());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers(config)?)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            client,
            cookies,
            base_url,
            service_url,
        })
    }

    /// Scheme and host of the portal.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of the query service page.
    #[must_use]
    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    /// Drop every cookie so the next form fetch starts a new server session
    /// and gets a new CAPTCHA.
    pub fn reset_cookies(&self) {
        self.cookies.clear();
        tracing::debug!("Session cookies cleared");
    }

    /// The `Cookie` header the session would send to `url`, if any.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.cookies
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    /// GET a page and return its decoded body.
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// GET a binary resource.
    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get(&self, url: &Url) -> Result<Response> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)?,
    );
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    Ok(headers)
}
