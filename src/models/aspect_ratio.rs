//! Categorical frame geometry of a probed video.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    Landscape,
    Portrait,
    Other,
}

impl AspectRatio {
    /// Classify from pixel dimensions.
    ///
    /// Each side is scaled by 16/9 (floored) and compared against the other
    /// side: `width == floor(16 * height / 9)` is landscape, otherwise
    /// `height == floor(16 * width / 9)` is portrait. Only exact 16:9 and
    /// 9:16 frames (after integer flooring) get a directional label.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let width = u64::from(width);
        let height = u64::from(height);
        let adj_width = 16 * width / 9;
        let adj_height = 16 * height / 9;

        if width == adj_height {
            AspectRatio::Landscape
        } else if height == adj_width {
            AspectRatio::Portrait
        } else {
            AspectRatio::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Other => "other",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
