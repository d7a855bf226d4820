//! Operator-driven CAPTCHA solving.

use crate::bitmap::CaptchaImage;
use crate::error::Result;
use crate::solver::CaptchaSolver;
use async_trait::async_trait;
use mvr_core::CaptchaConfig;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Source of operator answers.
///
/// Called on a blocking thread; implementations may wait indefinitely.
pub trait OperatorInput: Send + Sync {
    /// Show where the image is and return the operator's answer.
    fn prompt(&self, image_path: &Path) -> io::Result<String>;
}

/// Reads the answer from the terminal. Prompts go to stderr so stdout stays
/// free for the query result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinInput;

impl OperatorInput for StdinInput {
    fn prompt(&self, image_path: &Path) -> io::Result<String> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "\nCAPTCHA image saved to: {}", image_path.display())?;
        writeln!(stderr, "Please open the image and enter the CAPTCHA text below.")?;
        write!(stderr, "Enter CAPTCHA text: ")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// Shows the CAPTCHA to a human and submits whatever they type.
pub struct ManualSolver {
    image_path: PathBuf,
    open_viewer: bool,
    input: Arc<dyn OperatorInput>,
}

impl ManualSolver {
    /// Create a manual solver that reads answers from the terminal.
    #[must_use]
    pub fn new(image_path: impl Into<PathBuf>, open_viewer: bool) -> Self {
        Self::with_input(image_path, open_viewer, Arc::new(StdinInput))
    }

    /// Create a manual solver with a custom answer source.
    #[must_use]
    pub fn with_input(
        image_path: impl Into<PathBuf>,
        open_viewer: bool,
        input: Arc<dyn OperatorInput>,
    ) -> Self {
        Self {
            image_path: image_path.into(),
            open_viewer,
            input,
        }
    }

    /// Create a terminal-backed manual solver from the configuration.
    #[must_use]
    pub fn from_config(config: &CaptchaConfig) -> Self {
        Self::new(config.manual_image_path(), config.open_viewer)
    }

    /// Where the CAPTCHA image is written.
    #[must_use]
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }
}

#[async_trait]
impl CaptchaSolver for ManualSolver {
    async fn solve(&self, image: &CaptchaImage) -> Result<String> {
        image.save_png(&self.image_path)?;
        tracing::debug!("CAPTCHA image written to {}", self.image_path.display());

        if self.open_viewer {
            open_in_viewer(&self.image_path);
        }

        let input = Arc::clone(&self.input);
        let path = self.image_path.clone();
        let answer = tokio::task::spawn_blocking(move || input.prompt(&path))
            .await
            .map_err(io::Error::other)??;

        Ok(answer.trim().to_string())
    }

    fn allows_retry(&self) -> bool {
        false
    }
}

fn viewer_command(path: &Path) -> Command {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path);
    cmd
}

/// Best effort: a missing viewer only costs the operator a manual open.
fn open_in_viewer(path: &Path) {
    if let Err(e) = spawn_detached(viewer_command(path)) {
        tracing::debug!("Could not open CAPTCHA image viewer: {}", e);
    }
}

/// Start `command` without waiting for it; a background task reaps it.
fn spawn_detached(mut command: Command) -> io::Result<JoinHandle<()>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::debug!("Image viewer exited with {}", status);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Could not wait for image viewer: {}", e),
        }
    }))
}
