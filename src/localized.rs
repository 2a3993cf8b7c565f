use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported content languages.
///
/// English is the mandatory key on every localized field; Amharic and Oromo
/// are optional. Serialized as lowercase ISO 639-1 codes so the JSONB column
/// shape matches what clients send.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Am,
    Om,
}

impl Default for Lang {
    fn default() -> Self {
        Lang::En
    }
}

impl FromStr for Lang {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Lang::En),
            "am" => Ok(Lang::Am),
            "om" => Ok(Lang::Om),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Lang::En => "en",
            Lang::Am => "am",
            Lang::Om => "om",
        };
        write!(f, "{}", code)
    }
}

/// A localized text field: a map from language code to string with `en` as
/// the mandatory fallback.
///
/// This is the single canonical in-memory representation. Conversion between
/// the serialized JSONB column and this struct happens exactly once, at the
/// storage boundary (`sqlx::types::Json<LocalizedText>` on the row structs);
/// read sites never re-parse strings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct LocalizedText {
    pub en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub am: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub om: Option<String>,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>) -> Self {
        LocalizedText {
            en: en.into(),
            am: None,
            om: None,
        }
    }

    /// Whether the mandatory English text is present and non-blank.
    pub fn has_english(&self) -> bool {
        !self.en.trim().is_empty()
    }

    /// The text for `lang` if that translation exists and is non-blank.
    pub fn get(&self, lang: Lang) -> Option<&str> {
        let value = match lang {
            Lang::En => Some(self.en.as_str()),
            Lang::Am => self.am.as_deref(),
            Lang::Om => self.om.as_deref(),
        };
        value.filter(|s| !s.trim().is_empty())
    }

    /// The text for `lang`, falling back to English when the requested
    /// translation is missing.
    pub fn resolve(&self, lang: Lang) -> &str {
        self.get(lang).unwrap_or(&self.en)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_english() {
        let text = LocalizedText::new("X");
        assert_eq!(text.resolve(Lang::Am), "X");
        assert_eq!(text.resolve(Lang::Om), "X");
        assert_eq!(text.resolve(Lang::En), "X");
    }

    #[test]
    fn resolve_prefers_requested_language() {
        let text = LocalizedText {
            en: "X".to_string(),
            am: Some("Y".to_string()),
            om: None,
        };
        assert_eq!(text.resolve(Lang::Am), "Y");
        assert_eq!(text.resolve(Lang::Om), "X");
    }

    #[test]
    fn blank_translation_counts_as_missing() {
        let text = LocalizedText {
            en: "X".to_string(),
            am: Some("   ".to_string()),
            om: None,
        };
        assert_eq!(text.resolve(Lang::Am), "X");
    }

    #[test]
    fn has_english_rejects_blank() {
        assert!(LocalizedText::new("hello").has_english());
        assert!(!LocalizedText::new("  ").has_english());
    }

    #[test]
    fn lang_parses_from_code() {
        assert_eq!("am".parse::<Lang>(), Ok(Lang::Am));
        assert_eq!("om".parse::<Lang>(), Ok(Lang::Om));
        assert!("fr".parse::<Lang>().is_err());
    }

    #[test]
    fn serializes_without_missing_languages() {
        let text = LocalizedText::new("only english");
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json, serde_json::json!({ "en": "only english" }));
    }
}
