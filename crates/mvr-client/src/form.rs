//! Form page retrieval and CAPTCHA extraction.

use crate::error::Result;
use crate::session::HttpSession;
use mvr_captcha::{locate_captcha, CaptchaImage, CaptchaSource};
use scraper::Html;
use url::Url;

/// The query form page as served for the current session.
#[derive(Debug, Clone)]
pub struct FormPage {
    url: Url,
    html: String,
}

impl FormPage {
    /// Wrap an already fetched page.
    #[must_use]
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// URL the page was fetched from.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Parse the page into a DOM tree.
    #[must_use]
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// GET the service page with the session's cookies and headers.
pub async fn fetch_form_page(session: &HttpSession) -> Result<FormPage> {
    let url = session.service_url().clone();
    let html = session.get_text(&url).await?;
    tracing::debug!("Fetched form page ({} bytes)", html.len());
    Ok(FormPage::new(url, html))
}

/// Find and load the CAPTCHA of a form page.
///
/// Returns `Ok(None)` when the page has no CAPTCHA. Relative image sources
/// resolve against the host the page came from. Remote images are fetched
/// through `session` so the image belongs to the same server session as the
/// form.
pub async fn extract_captcha(
    session: &HttpSession,
    page: &FormPage,
) -> Result<Option<CaptchaImage>> {
    // The DOM is not Send; finish with it before awaiting.
    let source = {
        let document = page.document();
        locate_captcha(&document, page.url())?
    };

    let bytes = match source {
        None => return Ok(None),
        Some(CaptchaSource::Inline(bytes)) => {
            tracing::debug!("CAPTCHA is inline ({} bytes)", bytes.len());
            bytes
        }
        Some(CaptchaSource::Remote(url)) => {
            tracing::debug!("Fetching CAPTCHA image from {}", url);
            session.get_bytes(&url).await?
        }
    };

    Ok(Some(CaptchaImage::from_bytes(bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvr_core::ClientConfig;

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAAAAAA6fptVAAAACklEQVR4nGNgAAAAAgABSK+kcQAAAABJRU5ErkJggg==";

    fn session() -> HttpSession {
        HttpSession::new(&ClientConfig::default()).expect("session")
    }

    fn page(html: &str) -> FormPage {
        FormPage::new(Url::parse("https://www.mvr.bg/service").unwrap(), html)
    }

    #[tokio::test]
    async fn test_inline_captcha_needs_no_request() {
        let html = format!(r#"<img class="captcha" src="data:image/png;base64,{PNG_1X1}">"#);
        let image = extract_captcha(&session(), &page(&html))
            .await
            .expect("extract")
            .expect("captcha present");
        assert_eq!(image.dimensions(), (1, 1));
    }

    #[tokio::test]
    async fn test_page_without_captcha() {
        let found = extract_captcha(&session(), &page("<form><input name=\"egn\"></form>"))
            .await
            .expect("extract");
        assert!(found.is_none());
    }

    #[test]
    fn test_document_parses_body() {
        let page = page("<p class=\"x\">текст</p>");
        assert_eq!(page.url().path(), "/service");
        let selector = scraper::Selector::parse("p.x").unwrap();
        assert_eq!(page.document().select(&selector).count(), 1);
    }
}
