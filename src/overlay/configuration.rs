// Per-display overlay configuration: alpha, tint color, visibility.
//
// The persisted snapshot keeps alpha as a decimal string and color as
// "#rrggbb", matching the on-disk schema. Merging is value-semantic: a
// partial update produces a new configuration and never mutates through
// shared references, which keeps the round-trip and idempotence checks
// trivial.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_ALPHA: f32 = 0.0;
pub const DEFAULT_VISIBILITY: bool = true;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("alpha {0} outside [0, 1]")]
    AlphaOutOfRange(f32),
    #[error("unparseable color {0:?}")]
    InvalidColor(String),
    #[error("unparseable alpha {0:?}")]
    InvalidAlpha(String),
    #[error("unknown overlay action {0:?}")]
    UnknownAction(String),
}

/// Overlay tint as an opaque RGB color. Alpha lives separately in the
/// configuration; the color itself is always fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = ConfigurationError;

    /// Accepts "#rrggbb" only. The UI color picker emits this shape; anything
    /// else is rejected at the boundary rather than stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ConfigurationError::InvalidColor(s.to_string()))?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigurationError::InvalidColor(s.to_string()));
        }
        let channel = |range| u8::from_str_radix(&hex[range], 16).unwrap_or(0);
        Ok(Color {
            r: channel(0..2),
            g: channel(2..4),
            b: channel(4..6),
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Alpha travels as a decimal string in the persisted schema ("0.5", not 0.5).
mod alpha_string {
    use super::*;

    pub fn serialize<S: Serializer>(alpha: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}", alpha))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        let s = String::deserialize(deserializer)?;
        let alpha: f32 = s
            .parse()
            .map_err(|_| D::Error::custom(format!("unparseable alpha {s:?}")))?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(D::Error::custom(format!("alpha {alpha} outside [0, 1]")));
        }
        Ok(alpha)
    }
}

/// The full configuration of one overlay window. Owned by the live window;
/// a snapshot is persisted per display id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfiguration {
    #[serde(with = "alpha_string")]
    pub alpha: f32,
    pub color: Color,
    pub visibility: bool,
}

impl Default for OverlayConfiguration {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            color: Color::BLACK,
            visibility: DEFAULT_VISIBILITY,
        }
    }
}

impl OverlayConfiguration {
    /// Shallow merge: fields absent from `update` keep their current value.
    /// Returns a new value; the caller decides whether to adopt it. Rejects
    /// out-of-range alpha instead of clamping — the UI slider enforces its own
    /// narrower range, the model only accepts [0, 1].
    pub fn merged(&self, update: &ConfigurationUpdate) -> Result<Self, ConfigurationError> {
        if let Some(alpha) = update.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(ConfigurationError::AlphaOutOfRange(alpha));
            }
        }
        Ok(Self {
            alpha: update.alpha.unwrap_or(self.alpha),
            color: update.color.unwrap_or(self.color),
            visibility: update.visibility.unwrap_or(self.visibility),
        })
    }
}

/// Partial edit of an overlay configuration, as produced by the controller
/// surface (one slider or checkbox at a time).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationUpdate {
    pub alpha: Option<f32>,
    pub color: Option<Color>,
    pub visibility: Option<bool>,
}

impl ConfigurationUpdate {
    pub fn alpha(alpha: f32) -> Self {
        Self {
            alpha: Some(alpha),
            ..Self::default()
        }
    }

    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            ..Self::default()
        }
    }

    pub fn visibility(visibility: bool) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.is_none() && self.color.is_none() && self.visibility.is_none()
    }

    /// Compatibility shim for the old `(action, value)` message triple.
    /// The full-object shape is canonical; this exists only so stale
    /// controller builds keep working during upgrades.
    #[deprecated(note = "use the full-object ConfigurationUpdate shape")]
    pub fn from_legacy(action: &str, value: &str) -> Result<Self, ConfigurationError> {
        match action {
            "alpha" => {
                let alpha: f32 = value
                    .parse()
                    .map_err(|_| ConfigurationError::InvalidAlpha(value.to_string()))?;
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(ConfigurationError::AlphaOutOfRange(alpha));
                }
                Ok(Self::alpha(alpha))
            }
            "color" => Ok(Self::color(value.parse()?)),
            other => Err(ConfigurationError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_invisible_black() {
        let configuration = OverlayConfiguration::default();
        assert_eq!(configuration.alpha, 0.0);
        assert_eq!(configuration.color, Color::BLACK);
        assert!(configuration.visibility);
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let base = OverlayConfiguration::default();
        let step1 = base.merged(&ConfigurationUpdate::alpha(0.2)).unwrap();
        let step2 = step1
            .merged(&ConfigurationUpdate::color("#00ff00".parse().unwrap()))
            .unwrap();

        assert_eq!(step2.alpha, 0.2);
        assert_eq!(step2.color.to_string(), "#00ff00");
        assert_eq!(step2.visibility, base.visibility);
    }

    #[test]
    fn merge_rejects_out_of_range_alpha() {
        let base = OverlayConfiguration::default();
        assert_eq!(
            base.merged(&ConfigurationUpdate::alpha(1.5)),
            Err(ConfigurationError::AlphaOutOfRange(1.5))
        );
        assert_eq!(
            base.merged(&ConfigurationUpdate::alpha(-0.1)),
            Err(ConfigurationError::AlphaOutOfRange(-0.1))
        );
    }

    #[test]
    fn merge_accepts_boundary_alpha() {
        let base = OverlayConfiguration::default();
        assert_eq!(base.merged(&ConfigurationUpdate::alpha(0.0)).unwrap().alpha, 0.0);
        assert_eq!(base.merged(&ConfigurationUpdate::alpha(1.0)).unwrap().alpha, 1.0);
    }

    #[test]
    fn color_parses_hex() {
        let color: Color = "#ff8040".parse().unwrap();
        assert_eq!((color.r, color.g, color.b), (0xff, 0x80, 0x40));
        assert_eq!(color.to_string(), "#ff8040");
    }

    #[test]
    fn color_rejects_garbage() {
        assert!("ff8040".parse::<Color>().is_err());
        assert!("#ff80".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn alpha_serializes_as_decimal_string() {
        let configuration = OverlayConfiguration {
            alpha: 0.5,
            color: "#ff0000".parse().unwrap(),
            visibility: true,
        };
        let json = serde_json::to_string(&configuration).unwrap();
        assert!(json.contains("\"0.5\""), "alpha must be a string: {json}");

        let restored: OverlayConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, configuration);
    }

    #[test]
    fn persisted_alpha_outside_range_is_rejected() {
        let json = r##"{"alpha":"1.5","color":"#000000","visibility":true}"##;
        assert!(serde_json::from_str::<OverlayConfiguration>(json).is_err());
    }

    #[test]
    #[allow(deprecated)]
    fn legacy_triple_converts_to_update() {
        let update = ConfigurationUpdate::from_legacy("alpha", "0.3").unwrap();
        assert_eq!(update.alpha, Some(0.3));

        let update = ConfigurationUpdate::from_legacy("color", "#404040").unwrap();
        assert_eq!(update.color, Some("#404040".parse().unwrap()));

        assert!(ConfigurationUpdate::from_legacy("opacity", "0.3").is_err());
        assert!(ConfigurationUpdate::from_legacy("alpha", "nope").is_err());
    }
}
