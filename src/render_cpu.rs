use std::sync::Arc;

use crate::{
    assets::PreparedImage,
    composite_cpu,
    foundation::{
        core::{Affine, BezPath, Canvas, Rect, Rgba8},
        error::{GlassError, GlassResult},
    },
};

/// A rendered, premultiplied RGBA8 buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

/// Offscreen drawing surface backed by a `vello_cpu` pixmap.
///
/// Each draw call renders into a fresh transparent layer which is then composited over the
/// surface, so clips never leak between calls.
pub struct Surface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    /// Whether `canvas` can back a surface at all. Cheap; allocates nothing.
    pub fn supports(canvas: Canvas) -> bool {
        !canvas.is_empty()
            && u16::try_from(canvas.width).is_ok()
            && u16::try_from(canvas.height).is_ok()
    }

    /// Acquire a transparent surface, or `None` when the canvas cannot back one (a zero side or
    /// a side longer than `u16::MAX`).
    pub fn acquire(canvas: Canvas) -> Option<Self> {
        if canvas.is_empty() {
            tracing::warn!(?canvas, "cannot acquire surface for an empty canvas");
            return None;
        }
        let (Ok(width), Ok(height)) = (
            u16::try_from(canvas.width),
            u16::try_from(canvas.height),
        ) else {
            tracing::warn!(?canvas, "canvas exceeds the rasterizer limit");
            return None;
        };
        Some(Self {
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::new(u32::from(self.width), u32::from(self.height))
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    /// Source-over a solid color across the whole surface.
    pub fn fill(&mut self, color: Rgba8, opacity: f32) -> GlassResult<()> {
        composite_cpu::wash_in_place(self.data_mut(), color.premultiplied(), opacity)
    }

    /// Draw `image` stretched to `dest`, optionally clipped to `clip` (surface coordinates).
    pub fn draw_image(
        &mut self,
        image: &PreparedImage,
        dest: Rect,
        clip: Option<&BezPath>,
    ) -> GlassResult<()> {
        if image.is_empty() {
            return Err(GlassError::validation("cannot draw an empty image"));
        }
        let paint = image_paint(image)?;
        let sx = dest.width() / f64::from(image.width);
        let sy = dest.height() / f64::from(image.height);
        let placement =
            Affine::translate((dest.x0, dest.y0)) * Affine::scale_non_uniform(sx, sy);

        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        if let Some(clip) = clip {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.push_clip_layer(&bezpath_to_cpu(clip));
        }
        ctx.set_transform(affine_to_cpu(placement));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
        if clip.is_some() {
            ctx.pop_layer();
        }
        ctx.flush();

        let mut layer = vello_cpu::Pixmap::new(self.width, self.height);
        ctx.render_to_pixmap(&mut layer);
        composite_cpu::over_in_place(
            self.pixmap.data_as_u8_slice_mut(),
            layer.data_as_u8_slice(),
            1.0,
        )
    }

    pub fn into_frame(self) -> Frame {
        Frame {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.pixmap.data_as_u8_slice().to_vec(),
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_paint(image: &PreparedImage) -> GlassResult<vello_cpu::Image> {
    let w: u16 = image
        .width
        .try_into()
        .map_err(|_| GlassError::validation("image width exceeds u16"))?;
    let h: u16 = image
        .height
        .try_into()
        .map_err(|_| GlassError::validation("image height exceeds u16"))?;
    if image.rgba8_premul.len() != image.width as usize * image.height as usize * 4 {
        return Err(GlassError::validation("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels: Vec<_> = image
        .rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}
