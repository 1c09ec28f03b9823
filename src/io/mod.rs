//! Serialization formats
//!
//! Associations leave the engine through a pluggable format registry.
//! `dump` refuses invalid associations; `load` either uses the named
//! format exactly or tries every registered format in registration order
//! before giving up.

use crate::association::{AsnDocument, Association};
use crate::error::{AsnError, Result};

/// One serialization format for association documents
pub trait AsnFormat: Send + Sync {
    /// Keyword the format registers under (`json`, `yaml`)
    fn keyword(&self) -> &'static str;

    /// File extension for serialized output, without the dot
    fn extension(&self) -> &'static str;

    fn dump(&self, doc: &AsnDocument) -> Result<String>;

    fn load(&self, text: &str) -> Result<AsnDocument>;
}

/// JSON, the default interchange format
pub struct JsonFormat;

impl AsnFormat for JsonFormat {
    fn keyword(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn dump(&self, doc: &AsnDocument) -> Result<String> {
        Ok(serde_json::to_string_pretty(doc)?)
    }

    fn load(&self, text: &str) -> Result<AsnDocument> {
        Ok(serde_json::from_str(text)?)
    }
}

/// YAML, for hand-edited associations
pub struct YamlFormat;

impl AsnFormat for YamlFormat {
    fn keyword(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yaml"
    }

    fn dump(&self, doc: &AsnDocument) -> Result<String> {
        Ok(serde_yaml::to_string(doc)?)
    }

    fn load(&self, text: &str) -> Result<AsnDocument> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Registered formats, tried in registration order on format-less loads
pub struct IoRegistry {
    formats: Vec<Box<dyn AsnFormat>>,
}

impl IoRegistry {
    /// Empty registry; most callers want [`IoRegistry::default`]
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Register a format under its keyword
    pub fn register(&mut self, format: impl AsnFormat + 'static) -> Result<()> {
        if self.find(format.keyword()).is_some() {
            return Err(AsnError::FormatAlreadyRegistered {
                fmt: format.keyword().to_string(),
            });
        }
        self.formats.push(Box::new(format));
        Ok(())
    }

    /// Serialize a finished association.
    ///
    /// Returns the suggested file name and the serialized text. An
    /// association that does not validate is refused.
    pub fn dump(&self, assoc: &Association, fmt: &str) -> Result<(String, String)> {
        let format = self.find(fmt).ok_or_else(|| AsnError::UnknownFormat {
            fmt: fmt.to_string(),
        })?;

        let result = assoc.validate()?;
        if !result.is_valid {
            return Err(AsnError::NotValid {
                reason: result.summary(),
            });
        }

        let name = format!("{}.{}", assoc.asn_name(), format.extension());
        let text = format.dump(assoc.document())?;
        Ok((name, text))
    }

    /// Deserialize an association document.
    ///
    /// With `fmt` given, that format alone is used. Without it, every
    /// registered format is tried in order; exhaustion is a
    /// [`AsnError::LoadFailure`] naming what was tried.
    pub fn load(&self, text: &str, fmt: Option<&str>) -> Result<AsnDocument> {
        if let Some(fmt) = fmt {
            let format = self.find(fmt).ok_or_else(|| AsnError::UnknownFormat {
                fmt: fmt.to_string(),
            })?;
            return format.load(text);
        }

        for format in &self.formats {
            match format.load(text) {
                Ok(doc) => return Ok(doc),
                Err(err) => {
                    tracing::debug!(format = format.keyword(), %err, "format did not accept input");
                }
            }
        }
        Err(AsnError::LoadFailure {
            tried: self
                .formats
                .iter()
                .map(|f| f.keyword())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Registered format keywords, in trial order
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats.iter().map(|f| f.keyword())
    }

    fn find(&self, keyword: &str) -> Option<&dyn AsnFormat> {
        self.formats
            .iter()
            .find(|f| f.keyword() == keyword)
            .map(Box::as_ref)
    }
}

impl Default for IoRegistry {
    /// JSON first, YAML second
    fn default() -> Self {
        let mut registry = Self::new();
        // Registration of the built-ins cannot collide.
        let _ = registry.register(JsonFormat);
        let _ = registry.register(YamlFormat);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::Member;

    fn sample_doc() -> AsnDocument {
        let mut doc = AsnDocument::new("image", "image2", "o001", "pool_001", None);
        doc.add_member("t001", Member::new("a_rate.fits", "science"));
        doc
    }

    #[test]
    fn test_json_round_trip() {
        let registry = IoRegistry::default();
        let doc = sample_doc();
        let text = JsonFormat.dump(&doc).unwrap();
        assert_eq!(registry.load(&text, Some("json")).unwrap(), doc);
    }

    #[test]
    fn test_formatless_load_tries_all_formats() {
        let registry = IoRegistry::default();
        let doc = sample_doc();

        let yaml = YamlFormat.dump(&doc).unwrap();
        assert_eq!(registry.load(&yaml, None).unwrap(), doc);
    }

    #[test]
    fn test_unparseable_input_exhausts_formats() {
        let registry = IoRegistry::default();
        let err = registry.load(":\n\t- not a document", None).unwrap_err();
        match err {
            AsnError::LoadFailure { tried } => {
                assert_eq!(tried, "json, yaml");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let registry = IoRegistry::default();
        let err = registry.load("{}", Some("toml")).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_FORMAT");
    }

    #[test]
    fn test_duplicate_format_registration_is_rejected() {
        let mut registry = IoRegistry::default();
        let err = registry.register(JsonFormat).unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_ALREADY_REGISTERED");
    }
}
