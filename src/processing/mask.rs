use image::{GrayImage, Luma};

/// Mask value marking a selected pixel.
pub const MASK_ON: u8 = 255;

/// Filled disk of `radius` around `center`, 255 inside and 0 outside.
///
/// The disk is clipped to the image; a disk lying entirely outside the
/// image yields an all-zero mask. A negative radius selects nothing and a
/// zero radius selects only the center pixel.
pub fn disk_mask(width: u32, height: u32, center: (i32, i32), radius: i32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if radius < 0 || width == 0 || height == 0 {
        return mask;
    }

    let (cx, cy) = (i64::from(center.0), i64::from(center.1));
    let r = i64::from(radius);
    let r2 = r * r;

    let x0 = (cx - r).max(0);
    let y0 = (cy - r).max(0);
    let x1 = (cx + r).min(i64::from(width) - 1);
    let y1 = (cy + r).min(i64::from(height) - 1);
    if x0 > x1 || y0 > y1 {
        return mask;
    }

    for y in y0..=y1 {
        let dy = y - cy;
        for x in x0..=x1 {
            let dx = x - cx;
            if dx * dx + dy * dy <= r2 {
                mask.put_pixel(x as u32, y as u32, Luma([MASK_ON]));
            }
        }
    }
    mask
}
