//! Display-space / source-space coordinate mapping.
//!
//! Display space is the pixel grid of the container the video is rendered
//! into; source space is the native pixel grid of the decoded media. The
//! media is fitted with "contain" semantics, so one axis fills the container
//! and the other is centered between letterbox or pillarbox bars.

use crate::domain::model::{CropRegion, DisplayRect, MediaDimensions, Point, Size, SourceCropParams};

/// Fit the media's native aspect ratio inside the container.
pub fn compute_display_rect(container: Size, media: MediaDimensions) -> DisplayRect {
    let media_aspect = media.aspect_ratio();

    let (width, height) = if media_aspect > container.aspect_ratio() {
        // Wider than the container: fill width, letterbox top and bottom
        (container.width, container.width / media_aspect)
    } else {
        // Taller (or equal): fill height, pillarbox left and right
        (container.height * media_aspect, container.height)
    };

    DisplayRect {
        offset_x: (container.width - width) / 2.0,
        offset_y: (container.height - height) / 2.0,
        width,
        height,
    }
}

/// Scale factors from display pixels to native pixels, per axis.
pub fn scale_factors(display_rect: &DisplayRect, media: MediaDimensions) -> (f64, f64) {
    (
        media.width as f64 / display_rect.width,
        media.height as f64 / display_rect.height,
    )
}

/// Convert a display-space crop region into integer native-pixel crop parameters.
///
/// Negative coordinates (a region reaching into the letterbox bars) clamp to
/// zero. There is deliberately no upper clamp; see
/// [`SourceCropParams::fit_within`].
pub fn to_source_crop(region: &CropRegion, display_rect: &DisplayRect, media: MediaDimensions) -> SourceCropParams {
    let (scale_x, scale_y) = scale_factors(display_rect, media);

    let x = ((region.x - display_rect.offset_x) * scale_x).round();
    let y = ((region.y - display_rect.offset_y) * scale_y).round();
    let size = (region.size * scale_x.min(scale_y)).round();

    SourceCropParams {
        x: clamp_to_pixel(x),
        y: clamp_to_pixel(y),
        size: clamp_to_pixel(size),
    }
}

/// Map a display-space point into source space (unrounded).
pub fn to_source_point(point: Point, display_rect: &DisplayRect, media: MediaDimensions) -> Point {
    let (scale_x, scale_y) = scale_factors(display_rect, media);
    Point::new(
        (point.x - display_rect.offset_x) * scale_x,
        (point.y - display_rect.offset_y) * scale_y,
    )
}

/// Map a source-space point back into display space.
pub fn to_display_point(point: Point, display_rect: &DisplayRect, media: MediaDimensions) -> Point {
    let (scale_x, scale_y) = scale_factors(display_rect, media);
    Point::new(
        point.x / scale_x + display_rect.offset_x,
        point.y / scale_y + display_rect.offset_y,
    )
}

fn clamp_to_pixel(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value as u32
    }
}
