//! Page orientation and the fractional crop templates for the Notes block.

use crate::core::{ConfigError, ConfigValidator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page orientation, derived from the rendered page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Wider than tall.
    Landscape,
    /// Taller than wide, or square.
    Portrait,
}

impl Orientation {
    /// Landscape iff `width > height`; ties resolve to portrait.
    pub fn classify(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Returns the lowercase name used in results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crop region given as fractions of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropTemplate {
    /// Left edge as a fraction of page width
    pub x_min: f64,
    /// Right edge as a fraction of page width
    pub x_max: f64,
    /// Top edge as a fraction of page height
    pub y_min: f64,
    /// Bottom edge as a fraction of page height
    pub y_max: f64,
}

impl CropTemplate {
    /// Creates a template, checking `0 <= min < max <= 1` on both axes.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self, ConfigError> {
        let template = Self {
            x_min,
            x_max,
            y_min,
            y_max,
        };
        template.validate()?;
        Ok(template)
    }
}

impl ConfigValidator for CropTemplate {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_range("x_min", self.x_min as f32, 0.0, 1.0)?;
        self.validate_range("x_max", self.x_max as f32, 0.0, 1.0)?;
        self.validate_range("y_min", self.y_min as f32, 0.0, 1.0)?;
        self.validate_range("y_max", self.y_max as f32, 0.0, 1.0)?;
        if self.x_min >= self.x_max {
            return Err(ConfigError::invalid(
                "x_min",
                format!("must be less than x_max ({} >= {})", self.x_min, self.x_max),
            ));
        }
        if self.y_min >= self.y_max {
            return Err(ConfigError::invalid(
                "y_min",
                format!("must be less than y_max ({} >= {})", self.y_min, self.y_max),
            ));
        }
        Ok(())
    }
}

/// One crop template per orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesLayout {
    /// Upper-right block of a landscape sheet
    pub landscape: CropTemplate,
    /// Upper-left block of a portrait sheet
    pub portrait: CropTemplate,
}

impl Default for NotesLayout {
    fn default() -> Self {
        Self {
            landscape: CropTemplate {
                x_min: 0.62,
                x_max: 0.92,
                y_min: 0.09,
                y_max: 0.53,
            },
            portrait: CropTemplate {
                x_min: 0.12,
                x_max: 0.55,
                y_min: 0.05,
                y_max: 0.44,
            },
        }
    }
}

impl NotesLayout {
    /// Returns the template for `orientation`.
    pub fn template_for(&self, orientation: Orientation) -> &CropTemplate {
        match orientation {
            Orientation::Landscape => &self.landscape,
            Orientation::Portrait => &self.portrait,
        }
    }
}

impl ConfigValidator for NotesLayout {
    fn validate(&self) -> Result<(), ConfigError> {
        self.landscape
            .validate()
            .map_err(|e| ConfigError::invalid("layout.landscape", e.to_string()))?;
        self.portrait
            .validate()
            .map_err(|e| ConfigError::invalid("layout.portrait", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_classify() {
        assert_eq!(Orientation::classify(1000, 700), Orientation::Landscape);
        assert_eq!(Orientation::classify(700, 1000), Orientation::Portrait);
        assert_eq!(Orientation::classify(500, 500), Orientation::Portrait);
        assert_eq!(Orientation::classify(1, 0), Orientation::Landscape);
    }

    #[test]
    fn test_orientation_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Orientation::Landscape).unwrap(),
            "\"landscape\""
        );
        assert_eq!(Orientation::Portrait.to_string(), "portrait");
    }

    #[test]
    fn test_template_validation() {
        assert!(CropTemplate::new(0.1, 0.5, 0.0, 1.0).is_ok());
        assert!(CropTemplate::new(0.5, 0.5, 0.0, 1.0).is_err());
        assert!(CropTemplate::new(0.1, 1.2, 0.0, 1.0).is_err());
        assert!(CropTemplate::new(0.1, 0.5, 0.6, 0.4).is_err());
        assert!(CropTemplate::new(f64::NAN, 0.5, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_default_layout() {
        let layout = NotesLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.template_for(Orientation::Landscape).x_min, 0.62);
        assert_eq!(layout.template_for(Orientation::Portrait).y_max, 0.44);
    }
}
