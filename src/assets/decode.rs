use std::sync::Arc;

use crate::{
    assets::PreparedImage,
    foundation::error::{GlassError, GlassResult},
};

pub fn decode_image(bytes: &[u8]) -> GlassResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| GlassError::decode(format!("decode image from memory: {e}")))?;
    Ok(prepare_rgba(dyn_img.to_rgba8()))
}

pub fn prepare_rgba(rgba: image::RgbaImage) -> PreparedImage {
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    }
}

/// Convert premultiplied RGBA8 back to straight alpha.
pub fn unpremultiply_rgba8(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            if a == 0 {
                px[..3].fill(0);
            }
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
