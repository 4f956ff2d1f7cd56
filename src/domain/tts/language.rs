use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tag a client sends to ask for detection instead of a fixed language.
pub const AUTO_LANGUAGE_TAG: &str = "auto";

static DETECTOR: Lazy<LanguageDetector> = Lazy::new(|| {
    LanguageDetectorBuilder::from_languages(&[
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ])
    .build()
});

/// ISO 639-1 language codes supported by the speech backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
}

impl LanguageCode {
    /// Get the ISO 639-1 code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// Convert lingua Language to LanguageCode
    pub fn from_lingua(language: Language) -> Option<Self> {
        match language {
            Language::English => Some(LanguageCode::English),
            Language::Spanish => Some(LanguageCode::Spanish),
            Language::French => Some(LanguageCode::French),
            Language::German => Some(LanguageCode::German),
            Language::Italian => Some(LanguageCode::Italian),
            Language::Portuguese => Some(LanguageCode::Portuguese),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        // Accept region-qualified tags such as "es-MX" or "en_US"
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match primary.as_str() {
            "en" => Ok(LanguageCode::English),
            "es" => Ok(LanguageCode::Spanish),
            "fr" => Ok(LanguageCode::French),
            "de" => Ok(LanguageCode::German),
            "it" => Ok(LanguageCode::Italian),
            "pt" => Ok(LanguageCode::Portuguese),
            _ => Err(tag.to_string()),
        }
    }
}

/// Language requested at submission time. Detection needs the extracted
/// text, so `Auto` is only resolved once extraction has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSelection {
    Fixed(LanguageCode),
    Auto { fallback: LanguageCode },
}

impl LanguageSelection {
    /// A missing or blank tag selects `default`.
    pub fn parse(tag: Option<&str>, default: LanguageCode) -> Result<Self, String> {
        match tag.map(str::trim).filter(|t| !t.is_empty()) {
            None => Ok(LanguageSelection::Fixed(default)),
            Some(t) if t.eq_ignore_ascii_case(AUTO_LANGUAGE_TAG) => {
                Ok(LanguageSelection::Auto { fallback: default })
            }
            Some(t) => t.parse().map(LanguageSelection::Fixed),
        }
    }

    pub fn resolve(&self, text: &str) -> LanguageCode {
        match *self {
            LanguageSelection::Fixed(code) => code,
            LanguageSelection::Auto { fallback } => detect_language(text).unwrap_or_else(|| {
                tracing::warn!(fallback = %fallback, "Could not detect language, using fallback");
                fallback
            }),
        }
    }
}

/// Detect the language of the given text among the supported ones
pub fn detect_language(text: &str) -> Option<LanguageCode> {
    DETECTOR
        .detect_language_of(text)
        .and_then(LanguageCode::from_lingua)
}
