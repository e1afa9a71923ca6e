//! Conversions between 8-bit RGB and the derived color spaces the compositor edits.
//!
//! Derived planes are stored on the 8-bit scale (every plane spans `0.0..=255.0`)
//! but are kept as `f32` so an unedited round trip reproduces the source pixel.

use std::fmt;

use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::{FromColor, Hsl, Luv, Srgb};

/// Color model a channel is edited in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Hue, Lightness, Saturation (plane order H, L, S).
    Hls,
    /// CIE L*u*v* (plane order L, u, v).
    Luv,
}

// Luv u/v ranges mapped onto 0..=255.
const LUV_U_MIN: f32 = -134.0;
const LUV_U_SPAN: f32 = 354.0;
const LUV_V_MIN: f32 = -140.0;
const LUV_V_SPAN: f32 = 262.0;

impl ColorSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Luv => "luv",
        }
    }

    /// Convert one RGB pixel into this space's planes.
    pub fn from_rgb(self, rgb: [u8; 3]) -> [f32; 3] {
        let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
        match self {
            Self::Hls => {
                let hsl = Hsl::from_color(srgb);
                [
                    hsl.hue.into_positive_degrees() * 255.0 / 360.0,
                    hsl.lightness * 255.0,
                    hsl.saturation * 255.0,
                ]
            }
            Self::Luv => {
                let luv: Luv = Luv::from_color(srgb);
                [
                    luv.l * 255.0 / 100.0,
                    (luv.u - LUV_U_MIN) * 255.0 / LUV_U_SPAN,
                    (luv.v - LUV_V_MIN) * 255.0 / LUV_V_SPAN,
                ]
            }
        }
    }

    /// Convert planes back to RGB, clamping to gamut.
    pub fn to_rgb(self, planes: [f32; 3]) -> [u8; 3] {
        let srgb: Srgb<f32> = match self {
            Self::Hls => {
                let hsl = Hsl::new(
                    planes[0] * 360.0 / 255.0,
                    (planes[2] / 255.0).clamp(0.0, 1.0),
                    (planes[1] / 255.0).clamp(0.0, 1.0),
                );
                Srgb::from_color(hsl)
            }
            Self::Luv => {
                let luv = Luv::new(
                    planes[0] * 100.0 / 255.0,
                    planes[1] * LUV_U_SPAN / 255.0 + LUV_U_MIN,
                    planes[2] * LUV_V_SPAN / 255.0 + LUV_V_MIN,
                );
                Srgb::from_color(luv)
            }
        };
        [
            quantize(srgb.red * 255.0),
            quantize(srgb.green * 255.0),
            quantize(srgb.blue * 255.0),
        ]
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round an 8-bit-scale sample to `u8`. Non-finite samples map to zero.
pub fn quantize(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// A three-plane image in a derived color space.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedImage {
    space: ColorSpace,
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
}

impl DerivedImage {
    pub fn from_rgb(src: &RgbImage, space: ColorSpace) -> Self {
        let pixels = src.pixels().map(|p| space.from_rgb(p.0)).collect();
        Self {
            space,
            width: src.width(),
            height: src.height(),
            pixels,
        }
    }

    pub fn space(&self) -> ColorSpace {
        self.space
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// All planes of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[self.index(x, y)]
    }

    pub fn plane_value(&self, x: u32, y: u32, plane: usize) -> f32 {
        self.pixel(x, y)[plane]
    }

    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [[f32; 3]] {
        &mut self.pixels
    }

    /// Copy of this image with `plane` uniformly set to `value`.
    pub fn with_plane_filled(&self, plane: usize, value: u8) -> Self {
        let mut out = self.clone();
        let value = f32::from(value);
        for px in &mut out.pixels {
            px[plane] = value;
        }
        out
    }

    /// One plane rendered as an 8-bit gray image.
    pub fn plane_as_gray(&self, plane: usize) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([quantize(self.plane_value(x, y, plane))])
        })
    }

    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb(self.space.to_rgb(self.pixel(x, y)))
        })
    }
}
