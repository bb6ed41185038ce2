//! Liquid-glass compositing: a filtered, tinted background with an optional rounded 3:4
//! foreground card centered on top.

use std::time::Duration;

use crate::{
    assets::{ImageRef, PreparedImage, load_image},
    config::GlassConfig,
    encode::{EncodedImage, ExportFormat, encode_frame},
    foundation::{core::Canvas, error::GlassResult},
    fx::LiquidGlass,
    geometry::{CORNER_RADIUS_PX, foreground_rect, rounded_rect_path},
    render_cpu::{Frame, Surface},
};

#[derive(Clone, Debug)]
pub struct Compositor {
    pub canvas: Canvas,
    pub glass: LiquidGlass,
    pub corner_radius: f64,
    pub format: ExportFormat,
    pub quality: u8,
    pub load_timeout: Duration,
}

impl Compositor {
    pub fn new(canvas: Canvas) -> Self {
        let cfg = GlassConfig::default();
        Self {
            canvas,
            glass: LiquidGlass::default(),
            corner_radius: CORNER_RADIUS_PX,
            format: cfg.format,
            quality: cfg.jpeg_quality,
            load_timeout: cfg.load_timeout(),
        }
    }

    pub fn from_config(cfg: &GlassConfig) -> Self {
        Self {
            canvas: cfg.canvas,
            glass: LiquidGlass::default(),
            corner_radius: CORNER_RADIUS_PX,
            format: cfg.format,
            quality: cfg.jpeg_quality,
            load_timeout: cfg.load_timeout(),
        }
    }

    /// Load, composite and encode.
    ///
    /// With `foreground` omitted this produces the background-only preview; with it, the final
    /// export. Returns `Ok(None)` when no drawing surface can be acquired for the canvas; in
    /// that case neither image is loaded.
    #[tracing::instrument(skip_all, fields(canvas = ?self.canvas, with_foreground = foreground.is_some()))]
    pub async fn compose(
        &self,
        background: &ImageRef,
        foreground: Option<&ImageRef>,
    ) -> GlassResult<Option<EncodedImage>> {
        if !Surface::supports(self.canvas) {
            tracing::warn!(canvas = ?self.canvas, "no drawing surface, skipping composite");
            return Ok(None);
        }

        let bg = load_image(background, self.load_timeout).await?;
        let fg = match foreground {
            Some(r) => Some(load_image(r, self.load_timeout).await?),
            None => None,
        };

        let Some(frame) = self.compose_prepared(&bg, fg.as_ref())? else {
            return Ok(None);
        };
        let encoded = encode_frame(&frame, self.format, self.quality)?;
        tracing::info!(bytes = encoded.bytes.len(), "composite encoded");
        Ok(Some(encoded))
    }

    /// Composite already-decoded images into a fresh frame. Inputs are never modified.
    pub fn compose_prepared(
        &self,
        background: &PreparedImage,
        foreground: Option<&PreparedImage>,
    ) -> GlassResult<Option<Frame>> {
        let Some(mut surface) = Surface::acquire(self.canvas) else {
            return Ok(None);
        };

        surface.draw_image(background, self.canvas.bounds(), None)?;
        self.glass.apply_filter(surface.data_mut(), self.canvas)?;
        self.glass.apply_washes(surface.data_mut())?;

        if let Some(fg) = foreground {
            let rect = foreground_rect(self.canvas);
            let clip = rounded_rect_path(rect, self.corner_radius);
            tracing::debug!(?rect, "drawing foreground card");
            surface.draw_image(fg, rect, Some(&clip))?;
        }

        Ok(Some(surface.into_frame()))
    }
}
