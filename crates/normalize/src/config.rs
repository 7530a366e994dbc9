//! Normalizer configuration.
//!
//! Pure data: the same document, registry and config always normalize to the
//! same nodes.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;

/// Image CDN query parameters, applied in insertion order.
pub type ImageParams = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Inserted after `Prismic` in every generated type name.
    pub type_prefix: Option<String>,
    /// Params applied to every image URL.
    pub image_params: ImageParams,
    /// Params for the low-quality placeholder URL.
    pub placeholder_params: ImageParams,
    /// Width of the `fixed` descriptor (1x density).
    pub fixed_width: u32,
    /// Largest width of the `fluid` descriptor.
    pub fluid_max_width: u32,
    /// Joins block texts in a structured text's `text` rendering.
    pub text_separator: String,
}

impl NormalizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.type_prefix = Some(prefix.into());
        self
    }

    pub fn with_image_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.image_params.insert(key.into(), value.into());
        self
    }

    pub fn with_fixed_width(mut self, width: u32) -> Self {
        self.fixed_width = width;
        self
    }

    pub fn with_fluid_max_width(mut self, width: u32) -> Self {
        self.fluid_max_width = width;
        self
    }

    pub fn with_text_separator(mut self, separator: impl Into<String>) -> Self {
        self.text_separator = separator.into();
        self
    }

    /// Type-name prefix, or `""`.
    pub fn prefix(&self) -> &str {
        self.type_prefix.as_deref().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.fixed_width == 0 {
            return Err(NormalizeError::InvalidConfig(
                "fixed_width must be greater than zero".into(),
            ));
        }
        if self.fluid_max_width == 0 {
            return Err(NormalizeError::InvalidConfig(
                "fluid_max_width must be greater than zero".into(),
            ));
        }
        if let Some(prefix) = &self.type_prefix {
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(NormalizeError::InvalidConfig(format!(
                    "type_prefix '{prefix}' must be alphanumeric"
                )));
            }
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        let image_params = [("auto", "compress,format"), ("fit", "max"), ("q", "50")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let placeholder_params = [("w", "100"), ("blur", "15"), ("q", "20")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            type_prefix: None,
            image_params,
            placeholder_params,
            fixed_width: 400,
            fluid_max_width: 800,
            text_separator: " ".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = NormalizeConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.prefix(), "");
        assert_eq!(cfg.image_params.get("auto").map(String::as_str), Some("compress,format"));
    }

    #[test]
    fn zero_widths_and_odd_prefixes_fail() {
        assert!(NormalizeConfig::default().with_fixed_width(0).validate().is_err());
        assert!(NormalizeConfig::default().with_fluid_max_width(0).validate().is_err());
        assert!(NormalizeConfig::default().with_type_prefix("my-blog").validate().is_err());
        assert!(NormalizeConfig::default().with_type_prefix("Blog").validate().is_ok());
    }
}
