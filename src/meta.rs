use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Language name <-> two-letter code table carried over from the archive
/// metadata schema. Lookups are case-insensitive exact matches.
pub const LANGUAGES: [(&str, &str); 31] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("it", "Italian"),
    ("nl", "Dutch"),
    ("pt", "Portuguese"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("no", "Norwegian"),
    ("sv", "Swedish"),
    ("ru", "Russian"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("ar", "Arabic"),
    ("th", "Thai"),
    ("cs", "Czech"),
    ("hu", "Hungarian"),
    ("ca", "Catalan"),
    ("hr", "Croatian"),
    ("el", "Greek"),
    ("he", "Hebrew"),
    ("ro", "Romanian"),
    ("sk", "Slovak"),
    ("uk", "Ukrainian"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("vi", "Vietnamese"),
    ("zz", "Other"),
];

pub fn language_code(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Reduction of a META chunk's key/value text to the fixed field set.
/// `language` keeps the free-text label as written on disk; callers map it
/// to a code with [`language_code`] when they need one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub publisher: Option<String>,
    pub developer: Option<String>,
    pub copyright: Option<String>,
    pub version: Option<String>,
    pub language: Option<String>,
    pub requires_platform: Option<String>,
    pub requires_machine: Option<String>,
    pub requires_ram: Option<String>,
    pub notes: Option<String>,
    pub side: Option<String>,
    pub side_name: Option<String>,
    pub contributor: Option<String>,
    pub image_date: Option<String>,
}

impl MetaRecord {
    /// Parse newline-delimited, tab-split key/value text. Lines with fewer
    /// than two tab-separated fields are ignored; a duplicate key's last
    /// occurrence wins; unrecognized keys are dropped.
    pub fn parse(text: &str) -> Self {
        let mut pairs: HashMap<&str, &str> = HashMap::new();
        for line in text.lines() {
            let mut fields = line.split('\t');
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                continue;
            };
            pairs.insert(key.trim(), value.trim());
        }
        Self::from_pairs(&pairs)
    }

    fn from_pairs(pairs: &HashMap<&str, &str>) -> Self {
        let field = |key: &str| pairs.get(key).map(|v| v.to_string());
        Self {
            title: field("title"),
            subtitle: field("subtitle"),
            publisher: field("publisher"),
            developer: field("developer"),
            copyright: field("copyright"),
            version: field("version"),
            language: field("language"),
            requires_platform: field("requires_platform"),
            requires_machine: field("requires_machine"),
            requires_ram: field("requires_ram"),
            notes: field("notes"),
            side: field("side"),
            side_name: field("side_name"),
            contributor: field("contributor"),
            image_date: field("image_date"),
        }
    }

    pub fn language_code(&self) -> Option<&'static str> {
        self.language.as_deref().and_then(language_code)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
