//! Shared types used across the MVR client crates.

use crate::error::MvrError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Checksum weights for the tenth EGN digit.
const EGN_WEIGHTS: [u32; 9] = [2, 4, 8, 5, 10, 9, 7, 3, 6];

/// Newtype for a Bulgarian personal identification number (ЕГН).
///
/// The number is 10 digits: `YYMMDD` birth date (month offset by 20 for
/// births before 1900 and by 40 for births from 2000), a 3-digit region
/// serial and a mod-11 check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Egn(String);

impl Egn {
    /// Create a new `Egn` from a string.
    ///
    /// # Errors
    /// Returns error if the value is not a well-formed EGN.
    pub fn new(egn: impl Into<String>) -> Result<Self, MvrError> {
        let egn = egn.into();
        Self::validate(&egn)?;
        Ok(Self(egn))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the format, birth date and check digit of an EGN.
    pub fn validate(egn: &str) -> Result<(), MvrError> {
        static EGN_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = EGN_REGEX.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("valid regex"));

        if !regex.is_match(egn) {
            return Err(MvrError::Validation(format!(
                "invalid EGN: must be exactly 10 digits, got '{egn}'"
            )));
        }

        let digits: Vec<u32> = egn.chars().filter_map(|c| c.to_digit(10)).collect();

        let month = digits[2] * 10 + digits[3];
        let year = digits[0] * 10 + digits[1];
        let (year, month) = match month {
            1..=12 => (1900 + year, month),
            21..=32 => (1800 + year, month - 20),
            41..=52 => (2000 + year, month - 40),
            _ => {
                return Err(MvrError::Validation(format!(
                    "invalid EGN: month field {month:02} is out of range"
                )))
            }
        };
        let day = digits[4] * 10 + digits[5];
        if day == 0 || day > days_in_month(year, month) {
            return Err(MvrError::Validation(format!(
                "invalid EGN: day {day:02} is out of range for {year}-{month:02}"
            )));
        }

        let expected = checksum_digit(&digits[..9]);
        if digits[9] != expected {
            return Err(MvrError::Validation(format!(
                "invalid EGN: check digit is {}, expected {expected}",
                digits[9]
            )));
        }

        Ok(())
    }
}

/// Compute the EGN check digit from the first nine digits.
fn checksum_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip(EGN_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    let rest = sum % 11;
    if rest == 10 {
        0
    } else {
        rest
    }
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for Egn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Egn {
    type Err = MvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// OCR backends that can be used for automatic CAPTCHA solving.
///
/// The order in [`crate::CaptchaConfig::engines`] is the priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// Tesseract OCR command-line binary
    Tesseract,
    /// GOCR command-line binary
    Gocr,
}

impl OcrEngineKind {
    /// Name of the executable that provides this engine.
    #[must_use]
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Gocr => "gocr",
        }
    }
}

impl fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

impl FromStr for OcrEngineKind {
    type Err = MvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "gocr" => Ok(Self::Gocr),
            other => Err(MvrError::Validation(format!(
                "unknown OCR engine '{other}' (expected 'tesseract' or 'gocr')"
            ))),
        }
    }
}
