// THEORY:
// `EditorConfig` holds the few tunables of an editing session. It plays the
// same role for the editor that a pipeline configuration plays for a
// processing engine: one plain struct, cloned into whoever needs it, with
// defaults that reproduce the documented behaviour.
//
// Key architectural principles:
// 1.  **Plain Data**: All fields are public and serde-serializable, so the
//     config can be embedded in a host application's own settings file.
// 2.  **Fail Fast**: Loading from TOML validates before returning. An invalid
//     value is an error, never silently replaced by a default.
//
// TOML layout:
//
// ```toml
// zone_connectivity = "eight"
// small_corner_tolerance = [16.0, 20.0]
//
// [fill_threshold]
// lower = 0.0
// upper = inf
// ```

use crate::core_modules::blueprint_editor::AreaThreshold;
use crate::core_modules::clustering::Connectivity;
use crate::error::{BlueprintError, BlueprintResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Neighbourhood used to find the zones that fill, extend, reduce and
    /// remove_zones act on.
    pub zone_connectivity: Connectivity,
    /// When set, traced outlines are passed through `small_corner_removing`
    /// with this `(x, y)` tolerance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_corner_tolerance: Option<(f64, f64)>,
    /// Area range used by `fill_zones`.
    pub fill_threshold: AreaThreshold,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zone_connectivity: Connectivity::Eight,
            small_corner_tolerance: None,
            fill_threshold: AreaThreshold::ALL,
        }
    }
}

impl EditorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> BlueprintResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| BlueprintError::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> BlueprintResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BlueprintError::Config(format!("failed to read '{}': {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> BlueprintResult<String> {
        toml::to_string(self).map_err(|e| BlueprintError::Config(format!("failed to encode TOML: {e}")))
    }

    pub fn validate(&self) -> BlueprintResult<()> {
        let t = &self.fill_threshold;
        if t.lower.is_nan() || t.upper.is_nan() || t.lower > t.upper {
            return Err(BlueprintError::Config(format!(
                "fill_threshold must satisfy lower <= upper, got [{}, {}]",
                t.lower, t.upper
            )));
        }
        if let Some((tx, ty)) = self.small_corner_tolerance {
            if !(tx >= 0.0 && ty >= 0.0) {
                return Err(BlueprintError::Config(format!(
                    "small_corner_tolerance must be non-negative, got ({tx}, {ty})"
                )));
            }
        }
        Ok(())
    }
}
