use serde::{Deserialize, Serialize};

use super::color::Color;

/// A single pixel to draw. Serialized as the `[x, y, "rrggbb"]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32, Color)", into = "(u32, u32, Color)")]
pub struct Point {
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

impl Point {
    pub const fn new(x: u32, y: u32, color: Color) -> Self {
        Self { x, y, color }
    }
}

impl From<(u32, u32, Color)> for Point {
    fn from((x, y, color): (u32, u32, Color)) -> Self {
        Self::new(x, y, color)
    }
}

impl From<Point> for (u32, u32, Color) {
    fn from(point: Point) -> Self {
        (point.x, point.y, point.color)
    }
}
