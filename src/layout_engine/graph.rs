use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// Axis along which a split places its children side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Split along the longer side so both halves stay close to square.
    pub fn for_rect(rect: Rect) -> Self {
        if rect.width >= rect.height {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}
