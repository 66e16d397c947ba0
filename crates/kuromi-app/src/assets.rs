//! BMP decoding for `load` statements.

use std::path::Path;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use kuromi_lang::AssetError;
use tinybmp::Bmp;

/// Decoded image, row-major RGBA8 with the origin at the top-left.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn load_bmp(path: &Path) -> Result<DecodedImage, AssetError> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AssetError::NotFound { path: display.clone() },
        _ => AssetError::Decode { path: display.clone(), reason: e.to_string() },
    })?;
    decode_bmp(&bytes).map_err(|reason| AssetError::Decode { path: display, reason })
}

pub fn decode_bmp(bytes: &[u8]) -> Result<DecodedImage, String> {
    let bmp = Bmp::<Rgb888>::from_slice(bytes).map_err(|e| format!("{e:?}"))?;
    let Size { width, height } = bmp.size();
    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    for Pixel(point, color) in bmp.pixels() {
        if point.x < 0 || point.y < 0 || point.x as u32 >= width || point.y as u32 >= height {
            continue;
        }
        let i = (point.y as usize * width as usize + point.x as usize) * 4;
        rgba[i..i + 4].copy_from_slice(&[color.r(), color.g(), color.b(), 255]);
    }
    Ok(DecodedImage { width, height, rgba })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
