use image::{GenericImageView, Pixel};
use serde::Serialize;
use tracing::{info, warn};

use super::{Anchor, LocatorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    Banner,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Located {
    pub anchor: Anchor,
    pub detection: Detection,
    pub matched_pixels: u64,
}

/// Finds the centroid of the banner-colored pixels in the lower part of the image.
///
/// Only rows at or below `search_start * height` are scanned. Alpha is ignored.
/// When nothing matches (or the image is empty) the configured fallback anchor is
/// returned with [`Detection::Fallback`].
pub fn locate<I>(image: &I, config: &LocatorConfig) -> Located
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let start_row = search_start_row(height, config.search_start);

    let mut matched = 0u64;
    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    for y in start_row..height {
        for x in 0..width {
            let rgb = image.get_pixel(x, y).to_rgb().0;
            if config.band.contains(rgb) {
                matched += 1;
                sum_x += x as u64;
                sum_y += (y - start_row) as u64;
            }
        }
    }

    if matched == 0 {
        let anchor = fallback_anchor(width, height, config);
        warn!(
            "banner not found, using default position ({}, {})",
            anchor.x, anchor.y
        );
        return Located {
            anchor,
            detection: Detection::Fallback,
            matched_pixels: 0,
        };
    }

    let anchor = Anchor {
        x: (sum_x / matched) as u32,
        y: (sum_y / matched) as u32 + start_row,
    };
    info!(
        "found banner at ({}, {}), matched pixels: {}",
        anchor.x, anchor.y, matched
    );
    Located {
        anchor,
        detection: Detection::Banner,
        matched_pixels: matched,
    }
}

fn search_start_row(height: u32, fraction: f32) -> u32 {
    let row = (height as f64 * fraction.clamp(0.0, 1.0) as f64).floor() as u32;
    row.min(height)
}

fn fallback_anchor(width: u32, height: u32, config: &LocatorConfig) -> Anchor {
    let x = (width as f64 * config.fallback_x.clamp(0.0, 1.0) as f64).floor() as u32;
    let y = (height as f64 * config.fallback_y.clamp(0.0, 1.0) as f64).floor() as u32;
    Anchor {
        x: x.min(width.saturating_sub(1)),
        y: y.min(height.saturating_sub(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::ColorBand;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    const BANNER: Rgba<u8> = Rgba([244, 197, 66, 255]);
    const BACKGROUND: Rgba<u8> = Rgba([20, 40, 120, 255]);

    fn with_rect(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(width, height, BACKGROUND);
        for y in y0..y1 {
            for x in x0..x1 {
                image.put_pixel(x, y, BANNER);
            }
        }
        image
    }

    #[test]
    fn falls_back_when_no_pixel_matches() {
        let image = RgbaImage::from_pixel(1000, 1000, BACKGROUND);
        let located = locate(&image, &LocatorConfig::default());
        assert_eq!(located.anchor, Anchor { x: 500, y: 930 });
        assert_eq!(located.detection, Detection::Fallback);
        assert_eq!(located.matched_pixels, 0);
    }

    #[test]
    fn returns_rectangle_center() {
        let image = with_rect(1000, 1000, 100, 700, 200, 760);
        let located = locate(&image, &LocatorConfig::default());
        assert_eq!(located.detection, Detection::Banner);
        assert_eq!(located.matched_pixels, 100 * 60);
        assert!((located.anchor.x as i64 - 150).abs() <= 1);
        assert!((located.anchor.y as i64 - 730).abs() <= 1);
    }

    #[test]
    fn ignores_matches_above_search_area() {
        let mut image = with_rect(400, 400, 0, 0, 400, 100);
        for x in 50..150 {
            image.put_pixel(x, 380, BANNER);
        }
        let located = locate(&image, &LocatorConfig::default());
        assert_eq!(located.matched_pixels, 100);
        assert_eq!(located.anchor, Anchor { x: 99, y: 380 });
    }

    #[test]
    fn repeated_runs_agree() {
        let image = with_rect(640, 480, 13, 300, 611, 477);
        let config = LocatorConfig::default();
        let first = locate(&image, &config);
        for _ in 0..3 {
            assert_eq!(locate(&image, &config), first);
        }
    }

    #[test]
    fn alpha_channel_is_ignored() {
        let mut image = RgbaImage::from_pixel(100, 100, BACKGROUND);
        image.put_pixel(10, 90, Rgba([244, 197, 66, 0]));
        let located = locate(&image, &LocatorConfig::default());
        assert_eq!(located.anchor, Anchor { x: 10, y: 90 });
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let band = ColorBand {
            lower: [200, 160, 40],
            upper: [255, 220, 100],
        };
        assert!(band.contains([200, 160, 40]));
        assert!(band.contains([255, 220, 100]));
        assert!(!band.contains([199, 180, 60]));
        assert!(!band.contains([230, 221, 60]));
    }

    #[test]
    fn works_on_rgb_images() {
        let mut image = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        image.put_pixel(20, 40, Rgb([210, 170, 50]));
        image.put_pixel(30, 44, Rgb([210, 170, 50]));
        let located = locate(&image, &LocatorConfig::default());
        assert_eq!(located.anchor, Anchor { x: 25, y: 42 });
    }

    #[test]
    fn empty_image_degrades_to_fallback() {
        let image = RgbaImage::new(0, 0);
        let located = locate(&image, &LocatorConfig::default());
        assert_eq!(located.anchor, Anchor { x: 0, y: 0 });
        assert_eq!(located.detection, Detection::Fallback);
    }
}
