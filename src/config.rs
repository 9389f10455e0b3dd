//! Typed book configuration

use crate::error::ConfigError;
use crate::layout::Margins;
use serde::{Deserialize, Serialize};

/// How content overflows into pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagingMethod {
    /// Multi-column overflow, pages advance horizontally
    #[default]
    Column,
    /// Single column, pages advance by scrolling one viewport height
    Vertical,
}

/// Configuration for one paginated container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookConfig {
    pub paging_method: PagingMethod,
    pub margins: Margins,
    /// Base stacking order for the container
    pub z_index: i32,
    /// Media inside a page item is never shrunk below this height
    pub min_media_height: f32,
    /// Marker class of composite page items (image + caption)
    pub page_item_class: String,
    pub filler_class: String,
    /// Marker class for anchors whose filler could not be resolved
    pub failure_class: String,
    /// Class of per-page drawing canvases, left alone when shifting siblings
    pub draw_class: String,
    pub resize_debounce_ms: f64,
    /// Orientation changes recomputed immediately before falling back to the debounce
    pub orientation_burst_limit: u32,
    pub large_book_threshold_ms: f64,
    pub max_filler_retries: u32,
    pub font_poll_interval_ms: f64,
    /// Step of the fallback raster scan
    pub scan_step: f32,
    /// Pages an element hit may deviate from the current page and still be accepted
    pub page_tolerance: u32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            paging_method: PagingMethod::Column,
            margins: Margins::default(),
            z_index: 0,
            min_media_height: 150.0,
            page_item_class: "pageItem".to_string(),
            filler_class: "filler".to_string(),
            failure_class: "pageturn-failed".to_string(),
            draw_class: "draw".to_string(),
            resize_debounce_ms: 250.0,
            orientation_burst_limit: 5,
            large_book_threshold_ms: 150.0,
            max_filler_retries: 5,
            font_poll_interval_ms: 1500.0,
            scan_step: 30.0,
            page_tolerance: 1,
        }
    }
}

impl BookConfig {
    pub fn vertical() -> Self {
        Self {
            paging_method: PagingMethod::Vertical,
            ..Self::default()
        }
    }

    /// Parse a camelCase JSON configuration, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BookConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.margins;
        for (name, value) in [
            ("upper", m.upper),
            ("lower", m.lower),
            ("left", m.left),
            ("right", m.right),
        ] {
            if value < 0.0 || value.is_nan() {
                return Err(ConfigError::NegativeMargin { name, value });
            }
        }
        if !(self.min_media_height > 0.0) {
            return Err(ConfigError::MinMediaHeight(self.min_media_height));
        }
        for (name, class) in [
            ("pageItemClass", &self.page_item_class),
            ("fillerClass", &self.filler_class),
            ("failureClass", &self.failure_class),
            ("drawClass", &self.draw_class),
        ] {
            if class.trim().is_empty() {
                return Err(ConfigError::EmptyClass(name));
            }
        }
        Ok(())
    }

    /// Margins as applied by the active paging method
    ///
    /// Column mode mirrors the left margin on the right so the gap between
    /// columns never exposes a neighbouring page.
    pub fn effective_margins(&self) -> Margins {
        match self.paging_method {
            PagingMethod::Column => Margins {
                right: self.margins.left,
                ..self.margins
            },
            PagingMethod::Vertical => self.margins,
        }
    }

    pub fn column_gap(&self) -> f32 {
        2.0 * self.margins.left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(BookConfig::default().validate().is_ok());
        assert!(BookConfig::vertical().validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            BookConfig::from_json(r#"{"pagingMethod":"vertical","margins":{"upper":40}}"#).unwrap();
        assert_eq!(config.paging_method, PagingMethod::Vertical);
        assert_eq!(config.margins.upper, 40.0);
        assert_eq!(config.margins.left, Margins::default().left);
        assert_eq!(config.min_media_height, 150.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = BookConfig::default();
        config.margins.lower = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativeMargin {
                name: "lower",
                value: -1.0
            })
        );

        let mut config = BookConfig::default();
        config.min_media_height = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinMediaHeight(_))
        ));

        let mut config = BookConfig::default();
        config.filler_class = " ".into();
        assert_eq!(config.validate(), Err(ConfigError::EmptyClass("fillerClass")));

        assert!(matches!(
            BookConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_column_mirrors_left_margin() {
        let mut config = BookConfig::default();
        config.margins = Margins::new(20.0, 20.0, 30.0, 5.0);
        assert_eq!(config.effective_margins().right, 30.0);
        assert_eq!(config.column_gap(), 60.0);

        config.paging_method = PagingMethod::Vertical;
        assert_eq!(config.effective_margins().right, 5.0);
    }
}
