use crate::{
    blur_cpu::{blur_rgba8_premul, radius_for_sigma},
    composite_cpu::wash_in_place,
    foundation::{
        core::{Canvas, Rgba8},
        error::{GlassError, GlassResult},
    },
};

/// Standard deviation of the background blur, in pixels (`blur(10px)`).
pub const BLUR_SIGMA_PX: f32 = 10.0;
/// `brightness(1.2)`.
pub const BRIGHTNESS: f32 = 1.2;
/// `saturate(1.8)`.
pub const SATURATION: f32 = 1.8;
/// Light blue tint laid over the white wash.
pub const TINT_LIGHT_BLUE: Rgba8 = Rgba8::opaque(173, 216, 230);

/// One full-canvas color overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wash {
    pub color: Rgba8,
    pub opacity: f32,
}

/// The liquid-glass treatment of the background layer.
///
/// The filter chain runs in CSS order (blur, brightness, saturate) and the washes are painted
/// afterwards without the filter, in the order listed.
#[derive(Clone, Debug, PartialEq)]
pub struct LiquidGlass {
    pub blur_sigma: f32,
    pub brightness: f32,
    pub saturation: f32,
    pub washes: Vec<Wash>,
}

impl Default for LiquidGlass {
    fn default() -> Self {
        Self {
            blur_sigma: BLUR_SIGMA_PX,
            brightness: BRIGHTNESS,
            saturation: SATURATION,
            washes: vec![
                Wash {
                    color: Rgba8::WHITE,
                    opacity: 0.25,
                },
                Wash {
                    color: TINT_LIGHT_BLUE,
                    opacity: 0.10,
                },
            ],
        }
    }
}

impl LiquidGlass {
    /// Apply blur, brightness and saturation to a premultiplied buffer in place.
    #[tracing::instrument(skip(self, rgba8_premul))]
    pub fn apply_filter(&self, rgba8_premul: &mut [u8], canvas: Canvas) -> GlassResult<()> {
        if rgba8_premul.len() != canvas.pixel_count() * 4 {
            return Err(GlassError::validation(
                "filter buffer does not match canvas size",
            ));
        }

        let radius = radius_for_sigma(self.blur_sigma);
        if radius > 0 {
            let blurred = blur_rgba8_premul(
                rgba8_premul,
                canvas.width,
                canvas.height,
                radius,
                self.blur_sigma,
            )?;
            rgba8_premul.copy_from_slice(&blurred);
        }

        let matrix = color_matrix(self.brightness, self.saturation);
        for px in rgba8_premul.chunks_exact_mut(4) {
            apply_color_matrix(px, &matrix);
        }
        Ok(())
    }

    pub fn apply_washes(&self, rgba8_premul: &mut [u8]) -> GlassResult<()> {
        for wash in &self.washes {
            wash_in_place(rgba8_premul, wash.color.premultiplied(), wash.opacity)?;
        }
        Ok(())
    }
}

/// CSS `saturate(s)` color matrix, pre-scaled by the brightness factor.
fn color_matrix(brightness: f32, saturation: f32) -> [[f32; 3]; 3] {
    let s = saturation.max(0.0);
    let b = brightness.max(0.0);
    let m = [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ];
    m.map(|row| row.map(|v| v * b))
}

// Premultiplied channels stay bounded by alpha.
fn apply_color_matrix(px: &mut [u8], m: &[[f32; 3]; 3]) {
    let a = f32::from(px[3]);
    if px[3] == 0 {
        return;
    }
    let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
    for (i, row) in m.iter().enumerate() {
        let v = row[0] * r + row[1] * g + row[2] * b;
        px[i] = v.round().clamp(0.0, a) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_glass_recipe() {
        let glass = LiquidGlass::default();
        assert_eq!(glass.blur_sigma, 10.0);
        assert_eq!(glass.brightness, 1.2);
        assert_eq!(glass.saturation, 1.8);
        assert_eq!(glass.washes.len(), 2);
        assert_eq!(glass.washes[0].color, Rgba8::WHITE);
        assert_eq!(glass.washes[1].color, Rgba8::opaque(173, 216, 230));
    }

    #[test]
    fn gray_is_only_brightened() {
        let mut px = [100u8, 100, 100, 255];
        apply_color_matrix(&mut px, &color_matrix(1.2, 1.8));
        assert_eq!(px, [120, 120, 120, 255]);
    }

    #[test]
    fn saturation_pushes_channels_apart() {
        let mut px = [150u8, 100, 100, 255];
        apply_color_matrix(&mut px, &color_matrix(1.0, 1.8));
        assert!(px[0] > 150);
        assert!(px[1] < 100);
    }

    #[test]
    fn channels_clamp_to_alpha() {
        let mut px = [250u8, 250, 250, 255];
        apply_color_matrix(&mut px, &color_matrix(1.2, 1.0));
        assert_eq!(px, [255, 255, 255, 255]);
    }

    #[test]
    fn filter_rejects_wrong_size() {
        let mut buf = vec![0u8; 12];
        let err = LiquidGlass::default()
            .apply_filter(&mut buf, Canvas::new(2, 2))
            .unwrap_err();
        assert!(matches!(err, GlassError::Validation(_)));
    }
}
