//! Form discovery on the currently loaded page.

use crate::error::{Result, SnifferError};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const CAPTCHA_FRAMES: &str = "iframe[src*='recaptcha'], iframe[src*='hcaptcha']";

/// An `<input>` element's identifying attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
}

/// A `<button>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Button {
    pub button_type: Option<String>,
    pub text: String,
}

/// What the form on the page looks like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormReport {
    pub inputs: Vec<InputField>,
    /// `src` of each reCAPTCHA or hCaptcha frame
    pub captcha_frames: Vec<String>,
    pub buttons: Vec<Button>,
}

impl FormReport {
    /// Console listing of the form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Found {} input fields:", self.inputs.len());
        for (i, input) in self.inputs.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. Type: {}, Name: {}, ID: {}, Placeholder: {}",
                i + 1,
                show(input.input_type.as_deref()),
                show(input.name.as_deref()),
                show(input.id.as_deref()),
                show(input.placeholder.as_deref()),
            );
        }

        if self.captcha_frames.is_empty() {
            let _ = writeln!(out, "No CAPTCHA iframes found (reCAPTCHA/hCaptcha)");
        } else {
            let _ = writeln!(out, "Found {} CAPTCHA iframe(s)", self.captcha_frames.len());
            for src in &self.captcha_frames {
                let _ = writeln!(out, "   {src}");
            }
        }

        let _ = writeln!(out, "Found {} buttons:", self.buttons.len());
        for (i, button) in self.buttons.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. Type: {}, Text: {}",
                i + 1,
                show(button.button_type.as_deref()),
                button.text
            );
        }
        out
    }
}

fn show(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// Wait up to `timeout` for an `<input>` to appear, then list the form.
pub async fn inspect_form(page: &Page, timeout: Duration) -> Result<FormReport> {
    wait_for_selector(page, "input", timeout).await?;

    let mut report = FormReport::default();

    for element in page.find_elements("input").await? {
        report.inputs.push(InputField {
            input_type: attribute(&element, "type").await?,
            name: attribute(&element, "name").await?,
            id: attribute(&element, "id").await?,
            placeholder: attribute(&element, "placeholder").await?,
        });
    }

    for frame in page.find_elements(CAPTCHA_FRAMES).await? {
        if let Some(src) = attribute(&frame, "src").await? {
            report.captcha_frames.push(src);
        }
    }

    for element in page.find_elements("button").await? {
        let text = element.inner_text().await?.unwrap_or_default();
        report.buttons.push(Button {
            button_type: attribute(&element, "type").await?,
            text: text.trim().to_string(),
        });
    }

    Ok(report)
}

async fn attribute(element: &Element, name: &str) -> Result<Option<String>> {
    Ok(element.attribute(name).await?)
}

async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SnifferError::Inspection(format!(
                "no '{selector}' element after {}s",
                timeout.as_secs()
            )));
        }
        sleep(Duration::from_millis(250)).await;
    }
}

/// Save a full-page PNG screenshot.
pub async fn screenshot(page: &Page, path: &Path) -> Result<()> {
    let params = ScreenshotParams::builder().full_page(true).build();
    page.save_screenshot(params, path)
        .await
        .map_err(|e| SnifferError::Screenshot(format!("{}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_fields() {
        let report = FormReport {
            inputs: vec![InputField {
                input_type: Some("text".to_string()),
                name: Some("egn".to_string()),
                id: None,
                placeholder: Some("ЕГН".to_string()),
            }],
            captcha_frames: vec![],
            buttons: vec![Button {
                button_type: Some("submit".to_string()),
                text: "Търси".to_string(),
            }],
        };

        let text = report.render();
        assert!(text.contains("Found 1 input fields:"));
        assert!(text.contains("1. Type: text, Name: egn, ID: -, Placeholder: ЕГН"));
        assert!(text.contains("No CAPTCHA iframes found"));
        assert!(text.contains("1. Type: submit, Text: Търси"));
    }

    #[test]
    fn test_render_lists_captcha_frames() {
        let report = FormReport {
            captcha_frames: vec!["https://www.google.com/recaptcha/api2/anchor".to_string()],
            ..FormReport::default()
        };
        let text = report.render();
        assert!(text.contains("Found 1 CAPTCHA iframe(s)"));
        assert!(text.contains("recaptcha/api2/anchor"));
    }
}
