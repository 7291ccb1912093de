//! Watermarks - provenance codes bound to exactly one analysis result
//!
//! Format: `<PREFIX>-<YYYYMMDD>-<12 base36 chars>`, upper case.

use crate::analysis::AnalysisId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the random suffix
pub const SUFFIX_LEN: usize = 12;

/// A validated watermark code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WatermarkCode(String);

impl WatermarkCode {
    /// Assemble a code from its three parts
    pub fn from_parts(prefix: &str, date: &str, suffix: &str) -> Result<Self, String> {
        Self::parse(&format!("{}-{}-{}", prefix, date, suffix))
    }

    /// Validate and wrap a code string
    ///
    /// # Examples
    ///
    /// ```
    /// use thirdeye_domain::WatermarkCode;
    ///
    /// assert!(WatermarkCode::parse("3EV-20240315-0A1B2C3D4E5F").is_ok());
    /// assert!(WatermarkCode::parse("3EV-20241315-0A1B2C3D4E5F").is_err());
    /// assert!(WatermarkCode::parse("3ev-20240315-0a1b2c3d4e5f").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut parts = s.split('-');
        let (Some(prefix), Some(date), Some(suffix), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("Invalid watermark '{}': expected PREFIX-YYYYMMDD-SUFFIX", s));
        };

        if prefix.is_empty() || !prefix.chars().all(is_upper_base36) {
            return Err(format!("Invalid watermark prefix '{}'", prefix));
        }
        validate_date(date)?;
        if suffix.len() != SUFFIX_LEN || !suffix.chars().all(is_upper_base36) {
            return Err(format!(
                "Invalid watermark suffix '{}': expected {} base36 characters",
                suffix, SUFFIX_LEN
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// The code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `YYYYMMDD` date segment
    pub fn date(&self) -> &str {
        self.0.split('-').nth(1).unwrap_or("")
    }
}

fn is_upper_base36(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_uppercase()
}

fn validate_date(date: &str) -> Result<(), String> {
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid watermark date '{}'", date));
    }
    let month: u32 = date[4..6].parse().map_err(|_| format!("Invalid watermark date '{}'", date))?;
    let day: u32 = date[6..8].parse().map_err(|_| format!("Invalid watermark date '{}'", date))?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(format!("Invalid watermark date '{}'", date));
    }
    Ok(())
}

impl TryFrom<String> for WatermarkCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WatermarkCode> for String {
    fn from(code: WatermarkCode) -> Self {
        code.0
    }
}

impl fmt::Display for WatermarkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A watermark binding one code to one analysis result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    /// Unique code
    pub code: WatermarkCode,
    /// Result the code certifies
    pub analysis_id: AnalysisId,
    /// Creation time (seconds since epoch)
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let code = WatermarkCode::parse("3EV-20240315-ZZZZZZZZZZZZ").unwrap();
        assert_eq!(code.date(), "20240315");
        assert_eq!(code.to_string(), "3EV-20240315-ZZZZZZZZZZZZ");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "3EV",
            "3EV-20240315",
            "3EV-20240315-SHORT",
            "3EV-2024031-ABCDEFGHIJKL",
            "3EV-20240300-ABCDEFGHIJKL",
            "3EV-20240315-ABCDEFGHIJK!",
            "3EV-20240315-ABCDEFGHIJKL-EXTRA",
            "-20240315-ABCDEFGHIJKL",
        ] {
            assert!(WatermarkCode::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_from_parts() {
        let code = WatermarkCode::from_parts("3EV", "20250101", "000000000001").unwrap();
        assert_eq!(code.as_str(), "3EV-20250101-000000000001");
    }

    #[test]
    fn test_serde_validates() {
        let ok: Result<WatermarkCode, _> = serde_json::from_str("\"3EV-20240315-ABCDEFGHIJKL\"");
        assert!(ok.is_ok());
        let bad: Result<WatermarkCode, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
