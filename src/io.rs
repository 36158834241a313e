// ============================================================================
// IMAGE I/O — decode uploads, encode composites, data-URI transport
// ============================================================================

use base64::{Engine as _, engine::general_purpose};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

/// MIME prefix used for every exported composite. Stored gallery assets rely
/// on this exact string, so it must never change shape.
const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Errors surfaced by the I/O layer. A decode failure means a corrupt or
/// unsupported upload and must be reported distinctly from the "no image
/// loaded yet" empty state, which is not an error at all.
#[derive(Debug)]
pub enum ImageIoError {
    Decode(String),
    Encode(String),
    Io(String),
    BadDataUri(String),
}

impl std::fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageIoError::Decode(e) => write!(f, "Failed to decode image: {}", e),
            ImageIoError::Encode(e) => write!(f, "Failed to encode image: {}", e),
            ImageIoError::Io(e) => write!(f, "I/O error: {}", e),
            ImageIoError::BadDataUri(e) => write!(f, "Malformed data URI: {}", e),
        }
    }
}

impl std::error::Error for ImageIoError {}

/// Decode an uploaded raster (any supported container) into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ImageIoError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImageIoError::Decode(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Read and decode an image file from disk.
pub fn load_image_file(path: &Path) -> Result<RgbaImage, ImageIoError> {
    let bytes = fs::read(path).map_err(|e| ImageIoError::Io(e.to_string()))?;
    decode_image(&bytes)
}

/// Encode an RGBA raster as PNG bytes. PNG is the canonical export format:
/// lossless, alpha-capable, and deterministic for identical input.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ImageIoError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new(&mut out);
    encoder
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)
        .map_err(|e| ImageIoError::Encode(e.to_string()))?;
    Ok(out)
}

/// Write an RGBA raster to disk as PNG.
pub fn save_png_file(img: &RgbaImage, path: &Path) -> Result<(), ImageIoError> {
    let bytes = encode_png(img)?;
    fs::write(path, bytes).map_err(|e| ImageIoError::Io(e.to_string()))
}

/// Wrap PNG bytes in a `data:image/png;base64,` URI for transport to
/// consumers that expect a self-contained string (the format the original
/// gallery stored, preserved bit-for-bit).
pub fn to_png_data_uri(png_bytes: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URI_PREFIX, general_purpose::STANDARD.encode(png_bytes))
}

/// Extract the raw bytes from a base64 data URI. Accepts any image MIME
/// subtype; bare base64 without the prefix is rejected.
pub fn from_data_uri(uri: &str) -> Result<Vec<u8>, ImageIoError> {
    let comma = uri
        .find(',')
        .ok_or_else(|| ImageIoError::BadDataUri("missing ',' separator".to_string()))?;
    let (header, payload) = uri.split_at(comma);
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(ImageIoError::BadDataUri(format!(
            "unexpected header '{}'",
            header
        )));
    }
    general_purpose::STANDARD
        .decode(&payload[1..])
        .map_err(|e| ImageIoError::BadDataUri(e.to_string()))
}

/// Native "open image" dialog filtered to the formats we can decode.
pub fn pick_image_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
        .pick_file()
}

/// Native "save as PNG" dialog with a suggested file name.
pub fn pick_save_file(suggested: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("PNG image", &["png"])
        .set_file_name(suggested)
        .save_file()
}

/// Platform data directory (without the app sub-folder).
/// Shared by the session logger and the gallery store.
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}
