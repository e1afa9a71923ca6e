//! Per-frame compositing: spotlight edit plus the 2×2 preview canvas.

use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage, imageops};

use crate::processing::color::{ColorSpace, DerivedImage};
use crate::processing::mask::disk_mask;
use crate::source::SourceImage;
use crate::state::EditState;

/// Planes shown in the two gray preview quadrants (HLS L and S).
const PREVIEW_LIGHTNESS_PLANE: usize = 1;
const PREVIEW_SATURATION_PLANE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    /// Top-left.
    Original,
    /// Top-right.
    Lightness,
    /// Bottom-left.
    Saturation,
    /// Bottom-right.
    Edited,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [
        Self::Original,
        Self::Lightness,
        Self::Saturation,
        Self::Edited,
    ];

    /// `(column, row)` in the 2×2 grid.
    const fn cell(self) -> (u32, u32) {
        match self {
            Self::Original => (0, 0),
            Self::Lightness => (1, 0),
            Self::Saturation => (0, 1),
            Self::Edited => (1, 1),
        }
    }
}

/// The tiled canvas for one frame, `2·width × 2·height`.
#[derive(Debug, Clone)]
pub struct CompositeFrame {
    canvas: RgbImage,
    tile_w: u32,
    tile_h: u32,
}

impl CompositeFrame {
    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    /// Size of one quadrant (the source image size).
    pub fn tile_dimensions(&self) -> (u32, u32) {
        (self.tile_w, self.tile_h)
    }

    pub fn quadrant(&self, quadrant: Quadrant) -> RgbImage {
        let (col, row) = quadrant.cell();
        imageops::crop_imm(
            &self.canvas,
            col * self.tile_w,
            row * self.tile_h,
            self.tile_w,
            self.tile_h,
        )
        .to_image()
    }

    /// RGBA copy for texture upload.
    pub fn to_rgba8(&self) -> RgbaImage {
        DynamicImage::ImageRgb8(self.canvas.clone()).into_rgba8()
    }
}

/// Replace `plane` of `base` with `target`'s value wherever `mask` is set.
///
/// Hard select, no blending: unmasked pixels are copied from `base`
/// unchanged.
pub fn masked_overwrite(
    base: &DerivedImage,
    target: &DerivedImage,
    mask: &GrayImage,
    plane: usize,
) -> DerivedImage {
    assert_eq!(base.dimensions(), target.dimensions(), "target size mismatch");
    assert_eq!(base.dimensions(), mask.dimensions(), "mask size mismatch");
    assert_eq!(base.space(), target.space(), "target color space mismatch");

    let mut out = base.clone();
    for ((px, tgt), m) in out
        .pixels_mut()
        .iter_mut()
        .zip(target.pixels())
        .zip(mask.pixels())
    {
        if m.0[0] > 0 {
            px[plane] = tgt[plane];
        }
    }
    out
}

/// Derived image for `state`'s active channel with the spotlight applied.
pub fn edit_derived(base: &DerivedImage, state: &EditState) -> DerivedImage {
    let info = state.active_channel().info();
    debug_assert_eq!(base.space(), info.space);
    let (w, h) = base.dimensions();
    let mask = disk_mask(w, h, state.mask_center, state.mask_radius);
    let value = state.active_value().clamp(0, 255) as u8;
    let target = base.with_plane_filled(info.plane, value);
    masked_overwrite(base, &target, &mask, info.plane)
}

/// Build the frame for `source` under the (normalized) `state`.
pub fn composite(source: &SourceImage, state: &EditState) -> CompositeFrame {
    debug_assert!(state.is_normalized(), "edit state must be normalized");
    let rgb = source.pixels();
    let (w, h) = rgb.dimensions();

    let hls = DerivedImage::from_rgb(rgb, ColorSpace::Hls);
    let space = state.active_channel().info().space;
    let edited = match space {
        ColorSpace::Hls => edit_derived(&hls, state),
        ColorSpace::Luv => edit_derived(&DerivedImage::from_rgb(rgb, space), state),
    };

    let mut canvas = RgbImage::new(w * 2, h * 2);
    for quadrant in Quadrant::ALL {
        let tile = match quadrant {
            Quadrant::Original => rgb.clone(),
            Quadrant::Lightness => gray_to_rgb(&hls.plane_as_gray(PREVIEW_LIGHTNESS_PLANE)),
            Quadrant::Saturation => gray_to_rgb(&hls.plane_as_gray(PREVIEW_SATURATION_PLANE)),
            Quadrant::Edited => edited.to_rgb(),
        };
        let (col, row) = quadrant.cell();
        imageops::replace(&mut canvas, &tile, i64::from(col * w), i64::from(row * h));
    }

    CompositeFrame {
        canvas,
        tile_w: w,
        tile_h: h,
    }
}

fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}
