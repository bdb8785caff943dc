use std::path::Path;

use image::RgbImage;

use super::{Anchor, PointSource, SourceError};
use crate::models::{color::Color, point::Point};

/// Every pixel of a decoded image, converted to 8-bit RGB.
pub struct ImageSource {
    image: RgbImage,
}

impl ImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let image = image::open(path)?.to_rgb8();
        Ok(Self { image })
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }
}

impl PointSource for ImageSource {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn points(&self, anchor: Anchor) -> Box<dyn Iterator<Item = Point> + '_> {
        Box::new(self.image.enumerate_pixels().map(move |(x, y, pixel)| {
            let [r, g, b] = pixel.0;
            Point::new(
                anchor.x.saturating_add(x),
                anchor.y.saturating_add(y),
                Color::new(r, g, b),
            )
        }))
    }
}
