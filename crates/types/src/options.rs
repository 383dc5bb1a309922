//! Surgery options submitted with a process request.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Repair options chosen in the browser. Every field is optional on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurgeryOptions {
    pub remove_embed: bool,
    pub verbose: bool,
    pub font_mappings: Vec<FontMapping>,
    pub font_cleanup: FontCleanup,
}

/// A rule replacing one font name with another throughout the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontMapping {
    pub from: String,
    pub to: String,
}

impl FontMapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Both sides are non-blank. Incomplete rows from the form are ignored.
    pub fn is_complete(&self) -> bool {
        !self.from.trim().is_empty() && !self.to.trim().is_empty()
    }

    /// `from=to` with surrounding whitespace removed.
    pub fn to_arg(&self) -> String {
        format!("{}={}", self.from.trim(), self.to.trim())
    }
}

/// Fonts to keep during cleanup, in first-seen order without duplicates.
///
/// Accepts either a comma-separated string (`"Arial, Calibri"`) or a JSON
/// array of names. Serializes back as the comma-joined string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontCleanup(Vec<String>);

impl FontCleanup {
    pub fn new<I, S>(fonts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keep: Vec<String> = Vec::new();
        for font in fonts {
            let font = font.as_ref().trim();
            if font.is_empty() || keep.iter().any(|k| k == font) {
                continue;
            }
            keep.push(font.to_string());
        }
        Self(keep)
    }

    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl Serialize for FontCleanup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for FontCleanup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(String),
            Names(Vec<String>),
            Missing(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(list) => FontCleanup::parse(&list),
            Raw::Names(names) => FontCleanup::new(names),
            Raw::Missing(()) => FontCleanup::default(),
        })
    }
}
