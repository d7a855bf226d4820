//! CAPTCHA element lookup in the form page.
//!
//! The portal has served the challenge both as an inline base64 image and as
//! a separately fetched resource, and some variants of the form carry no
//! challenge at all. [`locate_captcha`] reports which case applies without
//! doing any network I/O.

use crate::error::{CaptchaError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Where the CAPTCHA image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaSource {
    /// Image embedded in the page as a base64 data URI (already decoded)
    Inline(Vec<u8>),
    /// Image that has to be fetched with the same session
    Remote(Url),
}

fn img_selector() -> &'static Selector {
    static IMG: OnceLock<Selector> = OnceLock::new();
    IMG.get_or_init(|| Selector::parse("img").expect("valid selector"))
}

fn captcha_regex() -> &'static Regex {
    static CAPTCHA: OnceLock<Regex> = OnceLock::new();
    CAPTCHA.get_or_init(|| Regex::new(r"(?i)captcha").expect("valid regex"))
}

fn alt_regex() -> &'static Regex {
    static ALT: OnceLock<Regex> = OnceLock::new();
    ALT.get_or_init(|| Regex::new(r"(?i)captcha|защитен код").expect("valid regex"))
}

/// First `<img>` whose `attr` attribute matches `pattern`.
fn find_img<'a>(images: &[ElementRef<'a>], attr: &str, pattern: &Regex) -> Option<ElementRef<'a>> {
    images
        .iter()
        .find(|img| img.value().attr(attr).is_some_and(|v| pattern.is_match(v)))
        .copied()
}

/// Locate the CAPTCHA image in a parsed form page.
///
/// Candidates are tried by class name, then alt text, then id. Returns
/// `Ok(None)` when no candidate exists or the chosen element has no `src`:
/// the caller should then submit without a CAPTCHA.
pub fn locate_captcha(document: &Html, base_url: &Url) -> Result<Option<CaptchaSource>> {
    let images: Vec<ElementRef<'_>> = document.select(img_selector()).collect();

    let element = find_img(&images, "class", captcha_regex())
        .or_else(|| find_img(&images, "alt", alt_regex()))
        .or_else(|| find_img(&images, "id", captcha_regex()));

    let Some(element) = element else {
        tracing::debug!("No CAPTCHA element in form page");
        return Ok(None);
    };

    let Some(src) = element
        .value()
        .attr("src")
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        tracing::debug!("CAPTCHA element has no src attribute");
        return Ok(None);
    };

    if src.starts_with("data:image") {
        let bytes = decode_data_uri(src)?;
        tracing::debug!("Found inline CAPTCHA image ({} bytes)", bytes.len());
        return Ok(Some(CaptchaSource::Inline(bytes)));
    }

    let url = resolve_src(base_url, src)?;
    tracing::debug!("Found remote CAPTCHA image at {}", url);
    Ok(Some(CaptchaSource::Remote(url)))
}

/// Decode the base64 payload of a `data:image/...;base64,` URI.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>> {
    let (_, payload) = src
        .split_once(',')
        .ok_or_else(|| CaptchaError::InvalidDataUri("missing ',' separator".to_string()))?;

    // Markup sometimes wraps long data URIs across lines
    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if payload.is_empty() {
        return Err(CaptchaError::InvalidDataUri("empty payload".to_string()));
    }

    Ok(STANDARD.decode(payload)?)
}

/// Turn an image `src` into an absolute URL on the portal.
///
/// - `http...` is used as is
/// - `/path` is resolved against the portal host
/// - anything else is treated as relative to the host root
pub fn resolve_src(base_url: &Url, src: &str) -> Result<Url> {
    let resolved = if src.starts_with("http") {
        Url::parse(src)
    } else if src.starts_with('/') {
        base_url.join(src)
    } else {
        base_url.join(&format!("/{src}"))
    };

    resolved.map_err(|source| CaptchaError::InvalidUrl {
        src: src.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.mvr.bg").unwrap()
    }

    fn locate(html: &str) -> Option<CaptchaSource> {
        locate_captcha(&Html::parse_document(html), &base()).expect("locate")
    }

    #[test]
    fn test_inline_data_uri_roundtrip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let html = format!(
            r#"<form><img class="captcha-img" src="data:image/png;base64,{}"></form>"#,
            STANDARD.encode(&bytes)
        );
        assert_eq!(locate(&html), Some(CaptchaSource::Inline(bytes)));
    }

    #[test]
    fn test_data_uri_with_line_breaks() {
        let encoded = STANDARD.encode(b"captcha bytes");
        let (a, b) = encoded.split_at(6);
        let src = format!("data:image/png;base64,{a}\n  {b}");
        assert_eq!(decode_data_uri(&src).unwrap(), b"captcha bytes");
    }

    #[test]
    fn test_data_uri_without_payload() {
        assert!(matches!(
            decode_data_uri("data:image/png;base64"),
            Err(CaptchaError::InvalidDataUri(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,"),
            Err(CaptchaError::InvalidDataUri(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(CaptchaError::Base64(_))
        ));
    }

    #[test]
    fn test_class_match_wins_over_alt_and_id() {
        let html = r#"
            <img id="captcha" src="/by-id.png">
            <img alt="Защитен код" src="/by-alt.png">
            <img class="form-Captcha" src="/by-class.png">
        "#;
        assert_eq!(
            locate(html),
            Some(CaptchaSource::Remote(
                Url::parse("https://www.mvr.bg/by-class.png").unwrap()
            ))
        );
    }

    #[test]
    fn test_alt_match_in_cyrillic() {
        let html = r#"<img src="/logo.png"><img alt="защитен код" src="img/code.jpg">"#;
        assert_eq!(
            locate(html),
            Some(CaptchaSource::Remote(
                Url::parse("https://www.mvr.bg/img/code.jpg").unwrap()
            ))
        );
    }

    #[test]
    fn test_id_match_is_last_resort() {
        let html = r#"<img src="/logo.png"><img id="captchaImage" src="https://cdn.example/c.png">"#;
        assert_eq!(
            locate(html),
            Some(CaptchaSource::Remote(
                Url::parse("https://cdn.example/c.png").unwrap()
            ))
        );
    }

    #[test]
    fn test_no_captcha_element() {
        let html = r#"<form><img src="/logo.png" alt="MVR"><input name="egn"></form>"#;
        assert_eq!(locate(html), None);
    }

    #[test]
    fn test_captcha_element_without_src() {
        let html = r#"<img class="captcha"><img alt="captcha" src="/fallback.png">"#;
        assert_eq!(locate(html), None);
    }

    #[test]
    fn test_resolve_src_forms() {
        let base = Url::parse("https://www.mvr.bg/some/page").unwrap();
        assert_eq!(
            resolve_src(&base, "/captcha.php?x=1").unwrap().as_str(),
            "https://www.mvr.bg/captcha.php?x=1"
        );
        assert_eq!(
            resolve_src(&base, "captcha.php").unwrap().as_str(),
            "https://www.mvr.bg/captcha.php"
        );
        assert_eq!(
            resolve_src(&base, "https://img.mvr.bg/c.png").unwrap().as_str(),
            "https://img.mvr.bg/c.png"
        );
        assert!(resolve_src(&base, "http://").is_err());
    }
}
