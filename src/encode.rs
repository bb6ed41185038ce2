use std::io::Cursor;

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;

use crate::{
    assets::decode::unpremultiply_rgba8,
    foundation::error::{GlassError, GlassResult},
    render_cpu::Frame,
};

/// JPEG quality used when none is configured; matches the browser `toDataURL` default.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Encoded output of a render, ready to display or export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// `data:` URL for embedding the image directly.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

pub fn encode_frame(frame: &Frame, format: ExportFormat, quality: u8) -> GlassResult<EncodedImage> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() != expected {
        return Err(GlassError::encode("frame byte length does not match its size"));
    }
    let straight = unpremultiply_rgba8(&frame.data);

    let mut bytes = Vec::new();
    match format {
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel; the frame is flattened as-is.
            let rgb: Vec<u8> = straight
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
            encoder
                .encode(&rgb, frame.width, frame.height, image::ExtendedColorType::Rgb8)
                .map_err(|e| GlassError::encode(format!("jpeg: {e}")))?;
        }
        ExportFormat::Png => {
            let rgba = image::RgbaImage::from_raw(frame.width, frame.height, straight)
                .ok_or_else(|| GlassError::encode("png: invalid frame buffer"))?;
            image::DynamicImage::ImageRgba8(rgba)
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(|e| GlassError::encode(format!("png: {e}")))?;
        }
    }

    Ok(EncodedImage {
        format,
        width: frame.width,
        height: frame.height,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(w: u32, h: u32, px: [u8; 4]) -> Frame {
        Frame {
            width: w,
            height: h,
            data: px.repeat((w * h) as usize),
        }
    }

    #[test]
    fn jpeg_roundtrip_keeps_dimensions() {
        let enc = encode_frame(&frame(16, 8, [200, 100, 50, 255]), ExportFormat::Jpeg, 92).unwrap();
        assert_eq!(
            image::guess_format(&enc.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&enc.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn png_preserves_exact_pixels() {
        let enc = encode_frame(&frame(2, 2, [10, 20, 30, 255]), ExportFormat::Png, 92).unwrap();
        let decoded = image::load_from_memory(&enc.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn data_url_has_mime_prefix() {
        let enc = encode_frame(&frame(1, 1, [0, 0, 0, 255]), ExportFormat::Jpeg, 80).unwrap();
        assert!(enc.data_url().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut f = frame(2, 2, [0, 0, 0, 255]);
        f.data.pop();
        assert!(matches!(
            encode_frame(&f, ExportFormat::Png, 92),
            Err(GlassError::Encode(_))
        ));
    }
}
