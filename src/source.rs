//! Picks an image out of the picture directory and prepares it at working size.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{ImageError, RgbImage, imageops};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Error;

/// The decoded, resized photo. Never mutated after load.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: Option<PathBuf>,
    pixels: RgbImage,
}

impl SourceImage {
    /// Wrap an in-memory image, e.g. a generated test pattern.
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { path: None, pixels }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    const EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            EXTS.iter().any(|e| *e == ext)
        })
}

/// Choose the image to edit.
///
/// A regular file named exactly `name` directly under `dir` wins. Otherwise
/// the supported images directly under `dir` are shuffled with `rng` and the
/// first is taken.
///
/// # Errors
/// [`Error::BadDir`] if `dir` is not a directory, [`Error::NotFound`] if it
/// holds no candidate.
pub fn resolve<R: Rng + ?Sized>(
    name: Option<&str>,
    dir: &Path,
    rng: &mut R,
) -> Result<PathBuf, Error> {
    if !dir.is_dir() {
        return Err(Error::BadDir(dir.display().to_string()));
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        // Follows symlinks so linked pictures count as files.
        .filter(|e| e.path().is_file())
        .map(|e| e.into_path())
        .collect();

    if let Some(name) = name {
        if let Some(hit) = files
            .iter()
            .find(|p| p.file_name().is_some_and(|f| f == name))
        {
            debug!(name, "found requested image");
            return Ok(hit.clone());
        }
        info!(name, "requested image not found; picking at random");
    }

    let mut candidates: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| is_supported_image(p))
        .collect();
    candidates.shuffle(rng);
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(dir.display().to_string()))
}

/// Decode `path`, apply EXIF orientation and resize to `target_width`,
/// keeping the aspect ratio.
///
/// # Errors
/// [`Error::Decode`] if the file cannot be opened or decoded.
pub fn load(path: &Path, target_width: u32) -> Result<SourceImage, Error> {
    let decoded = decode_rgb8_apply_exif(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let (w, h) = decoded.dimensions();
    let target_width = target_width.max(1);
    let target_height = scaled_height(w, h, target_width);
    let pixels = imageops::resize(
        &decoded,
        target_width,
        target_height,
        imageops::FilterType::Triangle,
    );
    info!(
        path = %path.display(),
        original_width = w,
        original_height = h,
        width = target_width,
        height = target_height,
        "loaded source image"
    );
    Ok(SourceImage {
        path: Some(path.to_path_buf()),
        pixels,
    })
}

/// Height that keeps the aspect ratio of `width × height` at `target_width`.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = f64::from(target_width) / f64::from(width.max(1)) * f64::from(height);
    (scaled.round() as u32).max(1)
}

fn decode_rgb8_apply_exif(path: &Path) -> Result<RgbImage, ImageError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let mut img = img.to_rgb8();

    let orientation: u16 = read_orientation(path).unwrap_or(1);
    match orientation {
        2 => img = imageops::flip_horizontal(&img),
        3 => img = imageops::rotate180(&img),
        4 => img = imageops::flip_vertical(&img),
        5 => {
            img = imageops::rotate90(&img);
            img = imageops::flip_horizontal(&img);
        }
        6 => img = imageops::rotate90(&img),
        7 => {
            img = imageops::rotate270(&img);
            img = imageops::flip_horizontal(&img);
        }
        8 => img = imageops::rotate270(&img),
        _ => {}
    }
    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    #[test]
    fn applies_orientation_six() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orient6.jpg");
        std::fs::write(&path, &bytes).unwrap();
        let img = decode_rgb8_apply_exif(&path).unwrap();
        assert_eq!(img.dimensions(), (1, 2));

        let loaded = load(&path, 10).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (10, 20));
    }

    #[test]
    fn scaled_height_rounds() {
        assert_eq!(scaled_height(1000, 500, 800), 400);
        assert_eq!(scaled_height(3, 2, 800), 533);
        assert_eq!(scaled_height(1000, 1, 10), 1);
        assert_eq!(scaled_height(0, 10, 10), 100);
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a/B.JPG")));
        assert!(is_supported_image(Path::new("c.webp")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }
}
