//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Retry budget used when `--retries` is not given.
pub const DEFAULT_RETRIES: u32 = 15;

#[derive(Debug, Parser)]
#[command(name = "mvr")]
#[command(
    author,
    version,
    about = "Query MVR for issued and not yet received Bulgarian identity documents"
)]
pub struct Cli {
    /// Bulgarian personal number (ЕГН)
    pub egn: String,

    /// Surname in Cyrillic
    pub surname: String,

    /// Solve the CAPTCHA by hand instead of with OCR
    #[arg(long, conflicts_with = "captcha")]
    pub manual: bool,

    /// Pre-solved CAPTCHA (skips fetching and solving)
    #[arg(long, value_name = "TEXT")]
    pub captcha: Option<String>,

    /// Max CAPTCHA retry attempts
    #[arg(long, default_value_t = DEFAULT_RETRIES, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the raw response HTML to this file
    #[arg(long, value_name = "FILE")]
    pub save_html: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The pre-solved CAPTCHA, if one was given. An empty value means the
    /// CAPTCHA still has to be solved.
    pub fn provided_captcha(&self) -> Option<&str> {
        self.captcha.as_deref().filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_positional_arguments_and_defaults() {
        let cli = parse(&["mvr", "7501010010", "Иванов"]);
        assert_eq!(cli.egn, "7501010010");
        assert_eq!(cli.surname, "Иванов");
        assert_eq!(cli.retries, DEFAULT_RETRIES);
        assert!(!cli.manual);
        assert!(!cli.json);
        assert!(cli.captcha.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = parse(&[
            "mvr",
            "7501010010",
            "Иванов",
            "--manual",
            "--retries",
            "3",
            "--json",
            "--save-html",
            "out.html",
            "-v",
        ]);
        assert!(cli.manual);
        assert_eq!(cli.retries, 3);
        assert!(cli.json);
        assert_eq!(cli.save_html, Some(PathBuf::from("out.html")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_captcha_value() {
        let cli = parse(&["mvr", "7501010010", "Иванов", "--captcha", "x7Kp2"]);
        assert_eq!(cli.provided_captcha(), Some("x7Kp2"));
    }

    #[test]
    fn test_empty_captcha_is_not_provided() {
        let cli = parse(&["mvr", "7501010010", "Иванов", "--captcha", ""]);
        assert_eq!(cli.captcha.as_deref(), Some(""));
        assert_eq!(cli.provided_captcha(), None);

        let cli = parse(&["mvr", "7501010010", "Иванов"]);
        assert_eq!(cli.provided_captcha(), None);
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(Cli::try_parse_from(["mvr", "7501010010", "Иванов", "--retries", "0"]).is_err());
    }

    #[test]
    fn test_manual_conflicts_with_captcha() {
        assert!(Cli::try_parse_from([
            "mvr",
            "7501010010",
            "Иванов",
            "--manual",
            "--captcha",
            "abc"
        ])
        .is_err());
    }

    #[test]
    fn test_missing_surname_rejected() {
        assert!(Cli::try_parse_from(["mvr", "7501010010"]).is_err());
    }
}
