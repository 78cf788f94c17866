//! Text normalization for field comparison
//!
//! All comparisons of text fields go through [`normalize_basic`]:
//! - Lowercase conversion
//! - Unicode NFD decomposition with combining marks removed
//! - Whitespace collapsed to single spaces and trimmed
//!
//! [`normalize_alpha_num`] and [`normalize_email`] are stricter variants used
//! for blocking keys and, for email, optionally for comparison.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Options that change how fields are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationConfig {
    /// Compare email with `+tag` suffixes stripped from the local part
    pub email_plus_addressing: bool,
}

/// Field normalizer built from an explicit [`NormalizationConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    config: NormalizationConfig,
}

impl Normalizer {
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    /// Equality used for names and addresses
    #[inline]
    pub fn text_eq(&self, a: Option<&str>, b: Option<&str>) -> bool {
        equals_normalized(a.unwrap_or(""), b.unwrap_or(""))
    }

    /// Equality used for email
    #[inline]
    pub fn email_eq(&self, a: Option<&str>, b: Option<&str>) -> bool {
        if self.config.email_plus_addressing {
            normalize_email(a.unwrap_or("")) == normalize_email(b.unwrap_or(""))
        } else {
            self.text_eq(a, b)
        }
    }
}

/// Lowercase, strip diacritics and collapse whitespace
pub fn normalize_basic(s: &str) -> String {
    let folded: String = s
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basic normalization restricted to `a-z`, `0-9` and single spaces
pub fn normalize_alpha_num(s: &str) -> String {
    let stripped: String = normalize_basic(s)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basic normalization plus removal of a `+tag` suffix from the local part
///
/// Values without `@`, or starting with `@`, come back basic-normalized only.
pub fn normalize_email(s: &str) -> String {
    let t = normalize_basic(s);

    match t.find('@') {
        Some(at) if at > 0 => {
            let (user, domain) = (&t[..at], &t[at + 1..]);
            let user = user.split('+').next().unwrap_or(user);
            format!("{}@{}", user, domain)
        }
        _ => t,
    }
}

/// True when both values are equal after [`normalize_basic`]
#[inline]
pub fn equals_normalized(a: &str, b: &str) -> bool {
    normalize_basic(a) == normalize_basic(b)
}
