//! Module codes extracted from module directory names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A short module code such as `HAI722I`, parsed from the front of a module
/// directory name.
///
/// The code is a run of ASCII letters, a run of digits, and one trailing
/// letter. Module directories that do not start with this shape have no code,
/// so code-based filters are best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleCode {
    /// The full code text, e.g. `HAI722I`.
    pub text: String,
    /// The numeric part, e.g. `722`.
    pub number: u32,
}

impl ModuleCode {
    /// Parses the code at the start of a module directory name.
    ///
    /// Returns `None` when the name does not begin with letters, digits, and
    /// a trailing letter.
    pub fn parse(module_name: &str) -> Option<Self> {
        let bytes = module_name.as_bytes();
        let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
        if letters == 0 {
            return None;
        }
        let digits = bytes[letters..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        let end = letters + digits;
        if !bytes.get(end).is_some_and(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        let number = module_name[letters..end].parse().ok()?;
        Some(Self {
            text: module_name[..=end].to_string(),
            number,
        })
    }

    /// Returns `true` if `pattern` names this code, either in full
    /// (case-insensitive) or by its numeric part.
    pub fn matches(&self, pattern: &str) -> bool {
        self.text.eq_ignore_ascii_case(pattern)
            || pattern.parse::<u32>().is_ok_and(|n| n == self.number)
    }
}

impl fmt::Display for ModuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_code() {
        let code = ModuleCode::parse("HAI722I").unwrap();
        assert_eq!(code.text, "HAI722I");
        assert_eq!(code.number, 722);
    }

    #[test]
    fn parse_code_with_title() {
        let code = ModuleCode::parse("HAI807I_Calcul_Formel").unwrap();
        assert_eq!(code.text, "HAI807I");
        assert_eq!(code.number, 807);
    }

    #[test]
    fn parse_rejects_missing_trailing_letter() {
        assert!(ModuleCode::parse("HAI720").is_none());
        assert!(ModuleCode::parse("HAI720_x").is_none());
    }

    #[test]
    fn parse_rejects_non_codes() {
        assert!(ModuleCode::parse("common").is_none());
        assert!(ModuleCode::parse("720I").is_none());
        assert!(ModuleCode::parse("").is_none());
    }

    #[test]
    fn matches_full_and_numeric() {
        let code = ModuleCode::parse("HAI702I").unwrap();
        assert!(code.matches("HAI702I"));
        assert!(code.matches("hai702i"));
        assert!(code.matches("702"));
        assert!(!code.matches("703"));
        assert!(!code.matches("HAI"));
    }

    #[test]
    fn display_is_text() {
        let code = ModuleCode::parse("HAI710I").unwrap();
        assert_eq!(code.to_string(), "HAI710I");
    }
}
