//! Producers of the point sequence a run draws.
//!
//! A source knows its own extent and yields its points row-major, already translated to
//! canvas coordinates by the run's [`Anchor`].

pub mod image;
pub mod pattern;

use serde::{Deserialize, Serialize};

use crate::models::point::Point;

pub use self::{image::ImageSource, pattern::PatternSource};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to load image: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("invalid pattern: {0}")]
    Pattern(String),
}

/// Top-left canvas position the source is drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: u32,
    pub y: u32,
}

impl Anchor {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

pub trait PointSource {
    /// Width and height of the source in points.
    fn dimensions(&self) -> (u32, u32);

    fn points(&self, anchor: Anchor) -> Box<dyn Iterator<Item = Point> + '_>;

    fn len(&self) -> u64 {
        let (width, height) = self.dimensions();
        u64::from(width) * u64::from(height)
    }
}
