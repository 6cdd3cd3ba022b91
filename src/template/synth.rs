//! Synthetic templates for structures without a user bitmap.

use crate::image::OwnedImage;
use crate::template::Template;
use crate::util::{ChipMatchError, ChipMatchResult};

/// Margin around the disc so the template contains background as well.
pub fn disc_padding(diameter: f32) -> usize {
    ((diameter / 4.0).round() as usize).max(2)
}

/// Side length of the square via template for `diameter`.
pub fn disc_side(diameter: f32) -> usize {
    diameter.ceil() as usize + 2 * disc_padding(diameter)
}

/// Renders a bright disc of `diameter` pixels on a dark square background.
///
/// A pixel is inside when its center lies within `diameter / 2` of the
/// template center.
pub fn disc_template(diameter: f32) -> ChipMatchResult<Template> {
    if !diameter.is_finite() || diameter < 1.0 {
        return Err(ChipMatchError::InvalidConfig {
            reason: "via diameter must be finite and >= 1",
        });
    }
    let side = disc_side(diameter);
    let center = (side as f32 - 1.0) * 0.5;
    let radius_sq = (diameter * 0.5).powi(2);
    let img = OwnedImage::from_fn(side, side, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if dx * dx + dy * dy <= radius_sq {
            255
        } else {
            0
        }
    })?;
    Ok(Template::from_image(img))
}
