use std::str::FromStr;

use log::warn;

use super::{Anchor, PointSource, SourceError};
use crate::models::{
    color::{Color, FALLBACK_COLOR},
    point::Point,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Red grows left to right, green top to bottom.
    Gradient,
    /// Alternating black and white squares of `cell` points.
    Checkerboard { cell: u32 },
}

impl FromStr for PatternKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gradient" => Ok(Self::Gradient),
            "checkerboard" => Ok(Self::Checkerboard { cell: 8 }),
            other => Err(SourceError::Pattern(format!("unknown pattern {other:?}"))),
        }
    }
}

/// A procedurally generated source, useful without an image at hand.
#[derive(Debug, Clone)]
pub struct PatternSource {
    kind: PatternKind,
    width: u32,
    height: u32,
}

impl PatternSource {
    pub fn new(kind: PatternKind, width: u32, height: u32) -> Self {
        Self {
            kind,
            width,
            height,
        }
    }

    /// Parses a `WIDTHxHEIGHT` size such as `64x32`.
    pub fn parse_size(size: &str) -> Result<(u32, u32), SourceError> {
        let invalid = || SourceError::Pattern(format!("invalid size {size:?}, expected WIDTHxHEIGHT"));
        let (width, height) = size.split_once('x').ok_or_else(invalid)?;
        let width = width.trim().parse().map_err(|_| invalid())?;
        let height = height.trim().parse().map_err(|_| invalid())?;
        Ok((width, height))
    }

    fn channels(&self, x: u32, y: u32) -> (i64, i64, i64) {
        match self.kind {
            PatternKind::Gradient => {
                let r = i64::from(x) * 255 / i64::from(self.width.saturating_sub(1).max(1));
                let g = i64::from(y) * 255 / i64::from(self.height.saturating_sub(1).max(1));
                (r, g, 255 - (r + g) / 2)
            }
            PatternKind::Checkerboard { cell } => {
                let cell = cell.max(1);
                let v = if (x / cell + y / cell) % 2 == 0 { 0 } else { 255 };
                (v, v, v)
            }
        }
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        let (r, g, b) = self.channels(x, y);
        Color::from_channels(r, g, b).unwrap_or_else(|e| {
            warn!("Pattern produced an invalid color at ({}, {}): {}", x, y, e);
            FALLBACK_COLOR
        })
    }
}

impl PointSource for PatternSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn points(&self, anchor: Anchor) -> Box<dyn Iterator<Item = Point> + '_> {
        Box::new((0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| {
                Point::new(
                    anchor.x.saturating_add(x),
                    anchor.y.saturating_add(y),
                    self.color_at(x, y),
                )
            })
        }))
    }
}
