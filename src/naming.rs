//! Naming standard for labels on the plan.
//!
//! FAT and FDT equipment is identified by a keyword substring in the nearby
//! label; poles follow one of a small set of site-survey numbering schemes.

use regex::Regex;

use crate::error::{Error, Result};

/// The pole-label formats observed across survey documents. Each compiles to a
/// fully anchored regex; a token must match the whole pattern to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolePattern {
    /// e.g. "1A", "2B", "10C"
    DigitsThenLetter,
    /// e.g. "P1", "T01", "A5"
    LetterThenDigits,
    /// e.g. "P-01", "T-10"
    LetterDashDigits,
    /// e.g. "1", "2", "10"
    DigitsOnly,
}

impl PolePattern {
    fn as_regex_str(self) -> &'static str {
        match self {
            PolePattern::DigitsThenLetter => r"^[0-9]+[A-Z]$",
            PolePattern::LetterThenDigits => r"^[A-Z]+[0-9]+$",
            PolePattern::LetterDashDigits => r"^[A-Z]+-[0-9]+$",
            PolePattern::DigitsOnly => r"^[0-9]+$",
        }
    }
}

/// Validated naming configuration, built once per detection run.
#[derive(Debug, Clone)]
pub struct NamingConfig {
    fat_keyword: String,
    fdt_keyword: String,
    pole_regex: Regex,
}

impl NamingConfig {
    /// Rejects empty keywords: an empty substring matches every token and
    /// would claim every symbol on the plan.
    pub fn new(
        fat_keyword: impl Into<String>,
        fdt_keyword: impl Into<String>,
        pole_pattern: PolePattern,
    ) -> Result<Self> {
        let fat_keyword = fat_keyword.into();
        let fdt_keyword = fdt_keyword.into();
        if fat_keyword.is_empty() || fdt_keyword.is_empty() {
            return Err(Error::InvalidNaming(
                "FAT/FDT keywords must be non-empty".into(),
            ));
        }
        let pole_regex = Regex::new(pole_pattern.as_regex_str())
            .expect("preset patterns are valid regexes");
        Ok(Self {
            fat_keyword,
            fdt_keyword,
            pole_regex,
        })
    }

    pub fn is_fat(&self, text: &str) -> bool {
        text.contains(&self.fat_keyword)
    }

    pub fn is_fdt(&self, text: &str) -> bool {
        text.contains(&self.fdt_keyword)
    }

    pub fn is_pole_label(&self, text: &str) -> bool {
        self.pole_regex.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keywords_are_rejected() {
        assert!(NamingConfig::new("", "FDT", PolePattern::DigitsOnly).is_err());
        assert!(NamingConfig::new("FOT", "", PolePattern::DigitsOnly).is_err());
        assert!(NamingConfig::new("FOT", "FDT", PolePattern::DigitsOnly).is_ok());
    }

    #[test]
    fn pole_presets_require_a_full_match() {
        let dash = NamingConfig::new("FOT", "FDT", PolePattern::LetterDashDigits).unwrap();
        assert!(dash.is_pole_label("P-07"));
        assert!(dash.is_pole_label("TN-123"));
        assert!(!dash.is_pole_label("P-07X"));
        assert!(!dash.is_pole_label("P07"));

        let digits = NamingConfig::new("FOT", "FDT", PolePattern::DigitsOnly).unwrap();
        assert!(digits.is_pole_label("42"));
        assert!(!digits.is_pole_label("P-07"));

        let da = NamingConfig::new("FOT", "FDT", PolePattern::DigitsThenLetter).unwrap();
        assert!(da.is_pole_label("10C"));
        assert!(!da.is_pole_label("C10"));

        let ad = NamingConfig::new("FOT", "FDT", PolePattern::LetterThenDigits).unwrap();
        assert!(ad.is_pole_label("T01"));
        assert!(!ad.is_pole_label("01T"));
    }

    #[test]
    fn keyword_match_is_substring_based() {
        let cfg = NamingConfig::new("FOT", "FDT", PolePattern::DigitsOnly).unwrap();
        assert!(cfg.is_fat("FOT12"));
        assert!(cfg.is_fat("XFOT-3"));
        assert!(!cfg.is_fat("fot12"));
        assert!(cfg.is_fdt("FDT-A1"));
        assert!(!cfg.is_fdt("FD-T"));
    }
}
