//! Image loading for the sweep pipeline
//!
//! All inputs are reduced to single-channel 8-bit intensity images before
//! enhancement. Color inputs are converted to luma on decode.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// File extensions accepted when scanning an input directory
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Single-channel 8-bit intensity image, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Intensity data, `width * height` bytes
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Build an image from raw intensity data
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(Error::InvalidImage(format!(
                "data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Intensity at (x, y). Coordinates are clamped to the image bounds,
    /// which gives the replicate border policy used by the metric kernels.
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.width as usize + x]
    }
}

/// A decoded source image together with its file name, the identifier
/// recorded in the master table
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub image: GrayImage,
}

/// Decode an image file to 8-bit grayscale
pub fn decode_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    let decoded = image::open(path)?;
    let luma = decoded.to_luma8();
    let (width, height) = luma.dimensions();
    GrayImage::from_raw(width, height, luma.into_raw())
}

/// List the supported raster images in a directory, sorted by file name
/// so that sweep ids are reproducible across runs
pub fn find_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Load every supported image under `input`, which may be a single file
/// or a directory. Unreadable files are logged and skipped.
pub fn load_sources<P: AsRef<Path>>(input: P) -> Result<Vec<SourceImage>> {
    let input = input.as_ref();
    let paths = if input.is_dir() {
        find_images(input)?
    } else {
        vec![input.to_path_buf()]
    };

    let mut sources = Vec::new();
    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        match decode_grayscale(&path) {
            Ok(image) => sources.push(SourceImage { name, image }),
            Err(e) => log::warn!("skipping unreadable image {}: {}", path.display(), e),
        }
    }
    Ok(sources)
}
