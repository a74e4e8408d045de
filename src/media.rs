use std::path::{Path, PathBuf};

use crate::{
    constants::{MEDIA_URL, RECIPE_IMAGE_DIR},
    error::Error,
};

pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
}

impl ImageFormat {
    /// Detects the format from the file's magic number and accepts it only
    /// when the header that format requires is present and consistent.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        let format = Self::from_magic(data)?;
        let valid = match format {
            ImageFormat::Jpeg => jpeg_header_is_valid(data),
            ImageFormat::Png => png_header_is_valid(data),
            ImageFormat::Gif => gif_header_is_valid(data),
            ImageFormat::WebP => webp_header_is_valid(data),
            ImageFormat::Bmp => bmp_header_is_valid(data),
        };

        valid.then_some(format)
    }

    fn from_magic(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(PNG_SIGNATURE) {
            Some(ImageFormat::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice()) {
            Some(ImageFormat::WebP)
        } else if data.starts_with(b"BM") {
            Some(ImageFormat::Bmp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
        }
    }
}

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn u16_le(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u16_be(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn u32_le(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn u32_be(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// SOI followed by a complete first segment.
fn jpeg_header_is_valid(data: &[u8]) -> bool {
    let Some(&marker) = data.get(3) else {
        return false;
    };
    let known = matches!(marker, 0xC0..=0xCF | 0xDB | 0xDD | 0xE0..=0xEF | 0xFE);
    let Some(length) = u16_be(data, 4).map(usize::from) else {
        return false;
    };

    known && length >= 2 && 4 + length <= data.len()
}

/// Signature followed by a well-formed `IHDR` chunk with a matching CRC.
fn png_header_is_valid(data: &[u8]) -> bool {
    let (Some(length), Some(width), Some(height), Some(crc)) = (
        u32_be(data, 8),
        u32_be(data, 16),
        u32_be(data, 20),
        u32_be(data, 29),
    ) else {
        return false;
    };

    length == 13
        && &data[12..16] == b"IHDR"
        && width > 0
        && height > 0
        && matches!(data[24], 1 | 2 | 4 | 8 | 16)
        && matches!(data[25], 0 | 2 | 3 | 4 | 6)
        && crc32fast::hash(&data[12..29]) == crc
}

/// Logical screen descriptor with a non-empty canvas.
fn gif_header_is_valid(data: &[u8]) -> bool {
    match (u16_le(data, 6), u16_le(data, 8), data.get(12)) {
        (Some(width), Some(height), Some(_)) => width > 0 && height > 0,
        _ => false,
    }
}

/// RIFF container holding a VP8, VP8L or VP8X chunk that fits inside it.
fn webp_header_is_valid(data: &[u8]) -> bool {
    let (Some(riff_size), Some(chunk_size)) = (u32_le(data, 4), u32_le(data, 16)) else {
        return false;
    };
    let riff_end = riff_size as usize + 8;
    let chunk_end = chunk_size as usize + 20;

    matches!(&data[12..16], b"VP8 " | b"VP8L" | b"VP8X")
        && riff_end <= data.len()
        && chunk_end <= riff_end + 1
}

/// File header and DIB header agree with each other and with the payload.
fn bmp_header_is_valid(data: &[u8]) -> bool {
    let (Some(file_size), Some(pixel_offset), Some(dib_size)) =
        (u32_le(data, 2), u32_le(data, 10), u32_le(data, 14))
    else {
        return false;
    };
    let (file_size, pixel_offset, dib_size) =
        (file_size as usize, pixel_offset as usize, dib_size as usize);

    if !matches!(dib_size, 12 | 40 | 52 | 56 | 64 | 108 | 124)
        || (file_size != 0 && file_size != data.len())
        || pixel_offset < 14 + dib_size
        || pixel_offset > data.len()
    {
        return false;
    }

    let dimensions = if dib_size == 12 {
        u16_le(data, 18)
            .zip(u16_le(data, 20))
            .zip(u16_le(data, 22))
            .map(|((width, height), planes)| width > 0 && height > 0 && planes == 1)
    } else {
        u32_le(data, 18)
            .zip(u32_le(data, 22))
            .zip(u16_le(data, 26))
            .map(|((width, height), planes)| {
                (width as i32) > 0 && (height as i32) != 0 && planes == 1
            })
    };

    dimensions.unwrap_or(false)
}

/// Uploaded files under a local root, addressed by `/media/...` references.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_upload_bytes: u64,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Stores the bytes under a fresh unique name and returns the reference.
    pub async fn save_recipe_image(&self, data: &[u8]) -> Result<String, Error> {
        let format = ImageFormat::sniff(data).ok_or_else(|| Error::validation("image", INVALID_IMAGE))?;
        let directory = self.root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| Error::Internal(format!("creating {}: {e}", directory.display())))?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), format.extension());
        let path = directory.join(&file_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::Internal(format!("writing {}: {e}", path.display())))?;

        log::debug!("Stored {} byte image at {}", data.len(), path.display());
        Ok(format!("{MEDIA_URL}{RECIPE_IMAGE_DIR}/{file_name}"))
    }

    /// Filesystem path of a reference produced by this store.
    pub fn path_of(&self, reference: &str) -> Option<PathBuf> {
        let relative = reference.strip_prefix(MEDIA_URL)?;
        if relative.is_empty() || relative.split('/').any(|part| part == ".." || part.is_empty()) {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Best effort; a missing file is not an error.
    pub async fn remove(&self, reference: &str) {
        let Some(path) = self.path_of(reference) else {
            log::warn!("Refusing to remove unrecognised media reference {reference}");
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {}: {e}", path.display()),
        }
    }
}
