//! Classification of the portal's HTML answer.
//!
//! The portal has no API; the answer is a full HTML page whose message box
//! has changed class names over time. The parser looks for a message
//! container first and only then falls back to matching known phrases in the
//! page text. That fallback is tied to the current wording and will
//! misclassify silently if the portal rephrases its messages.

use crate::result::{Outcome, QueryResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Result text used when the response matched nothing known.
pub const UNPARSED_TEXT: &str = "Could not parse result";

/// Error markers ("Error", "Invalid") in the portal's messages.
const ERROR_TOKENS: [&str; 2] = ["Грешка", "Невалидна"];

/// Marker for CAPTCHA-related errors, matched in lowercase.
const CAPTCHA_TOKEN: &str = "капча";

fn classed_selector() -> &'static Selector {
    static CLASSED: OnceLock<Selector> = OnceLock::new();
    CLASSED.get_or_init(|| Selector::parse("[class]").expect("valid selector"))
}

fn success_regex() -> &'static Regex {
    static SUCCESS: OnceLock<Regex> = OnceLock::new();
    SUCCESS.get_or_init(|| {
        Regex::new(r"(?s)След\s+\d{2}\.\d{2}\.\d{4}.*?получен\.").expect("valid regex")
    })
}

fn error_regex() -> &'static Regex {
    static ERROR: OnceLock<Regex> = OnceLock::new();
    ERROR.get_or_init(|| Regex::new(r"(?si)Грешка.*?капча|Невалидна.*?капча").expect("valid regex"))
}

/// Parses query responses into [`QueryResult`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser;

impl ResultParser {
    /// Create a parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify a response body and keep it as the result's raw HTML.
    #[must_use]
    pub fn parse(&self, egn: &str, surname: &str, body: String) -> QueryResult {
        let (outcome, text) = self.classify(&body);
        tracing::debug!("Parsed response as {}: {}", outcome, text);
        QueryResult::new(outcome, egn, surname, text, body)
    }

    /// Classify a response body, returning the outcome and the message text.
    #[must_use]
    pub fn classify(&self, body: &str) -> (Outcome, String) {
        let document = Html::parse_document(body);

        if let Some(container) = find_container(&document) {
            let text = container_text(container);
            return (classify_text(&text), text);
        }

        let page_text: String = document.root_element().text().collect();

        if let Some(m) = success_regex().find(&page_text) {
            return (Outcome::Success, m.as_str().to_string());
        }

        if let Some(m) = error_regex().find(&page_text) {
            return (Outcome::CaptchaError, m.as_str().to_string());
        }

        (Outcome::Unparsed, UNPARSED_TEXT.to_string())
    }
}

/// First message container, by priority: alert box, info bubble, result box.
fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    let has_class = |el: &ElementRef<'_>, needle: &str| {
        el.value()
            .classes()
            .any(|class| class.to_lowercase().contains(needle))
    };

    let mut classed = document.select(classed_selector());
    if let Some(alert) = classed.find(|el| has_class(el, "alert")) {
        return Some(alert);
    }

    document
        .select(classed_selector())
        .find(|el| el.value().name() == "div" && has_class(el, "info-bubble"))
        .or_else(|| {
            document
                .select(classed_selector())
                .find(|el| has_class(el, "result"))
        })
}

/// Trimmed text nodes joined by single spaces.
fn container_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn classify_text(text: &str) -> Outcome {
    if !ERROR_TOKENS.iter().any(|token| text.contains(token)) {
        return Outcome::Success;
    }

    if text.to_lowercase().contains(CAPTCHA_TOKEN) {
        Outcome::CaptchaError
    } else {
        Outcome::QueryError
    }
}
