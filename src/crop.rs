use crate::{
    assets::PreparedImage,
    encode::{EncodedImage, ExportFormat, encode_frame},
    foundation::{
        core::{Canvas, Rect},
        error::{GlassError, GlassResult},
    },
    render_cpu::Surface,
};

/// Crop region in source pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Width:height ratio the crop is constrained to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aspect {
    pub w: u32,
    pub h: u32,
}

impl Aspect {
    pub const PORTRAIT_3_4: Self = Self { w: 3, h: 4 };
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn fits(&self, image_w: u32, image_h: u32) -> bool {
        self.is_valid()
            && u64::from(self.x) + u64::from(self.width) <= u64::from(image_w)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(image_h)
    }

    /// Pixel crop for a crop view showing the image at `zoom` (>= 1) with a normalized `pan`
    /// in `[-1, 1]` on each axis. `(1.0, (0, 0))` is the largest centered rect of `aspect`.
    pub fn for_view(
        image_w: u32,
        image_h: u32,
        aspect: Aspect,
        zoom: f64,
        pan: (f64, f64),
    ) -> GlassResult<Self> {
        if image_w == 0 || image_h == 0 {
            return Err(GlassError::validation("cannot crop an empty image"));
        }
        if aspect.w == 0 || aspect.h == 0 {
            return Err(GlassError::validation("crop aspect must be non-zero"));
        }
        if !zoom.is_finite() || zoom < 1.0 {
            return Err(GlassError::validation("crop zoom must be >= 1"));
        }

        let (iw, ih) = (f64::from(image_w), f64::from(image_h));
        let ratio = f64::from(aspect.w) / f64::from(aspect.h);
        let (mut cw, mut ch) = if iw / ih > ratio {
            (ih * ratio, ih)
        } else {
            (iw, iw / ratio)
        };
        cw /= zoom;
        ch /= zoom;

        let width = (cw.floor() as u32).clamp(1, image_w);
        let height = (ch.floor() as u32).clamp(1, image_h);
        let slack_x = f64::from(image_w - width);
        let slack_y = f64::from(image_h - height);
        let px = pan.0.clamp(-1.0, 1.0);
        let py = pan.1.clamp(-1.0, 1.0);
        let x = (slack_x / 2.0 * (1.0 + px)).round() as u32;
        let y = (slack_y / 2.0 * (1.0 + py)).round() as u32;

        Ok(Self {
            x: x.min(image_w - width),
            y: y.min(image_h - height),
            width,
            height,
        })
    }
}

impl std::str::FromStr for CropRect {
    type Err = GlassError;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(GlassError::validation(format!(
                "crop '{s}' must be x,y,width,height"
            )));
        };
        let num = |v: &str| {
            v.parse::<u32>()
                .map_err(|_| GlassError::validation(format!("crop value '{v}' is not a u32")))
        };
        Ok(Self::new(num(x)?, num(y)?, num(w)?, num(h)?))
    }
}

/// Copy `rect` out of `source` and encode it, like exporting a canvas sized to the crop.
#[tracing::instrument(skip(source), fields(src_w = source.width, src_h = source.height))]
pub fn crop_image(
    source: &PreparedImage,
    rect: CropRect,
    format: ExportFormat,
    quality: u8,
) -> GlassResult<EncodedImage> {
    if !rect.fits(source.width, source.height) {
        return Err(GlassError::validation(format!(
            "crop {rect:?} does not fit a {}x{} image",
            source.width, source.height
        )));
    }
    let region = crop_region(source, rect);
    let Some(mut surface) = Surface::acquire(Canvas::new(rect.width, rect.height)) else {
        return Err(GlassError::validation("crop exceeds the rasterizer limit"));
    };
    surface.draw_image(&region, Rect::new(0.0, 0.0, f64::from(rect.width), f64::from(rect.height)), None)?;
    encode_frame(&surface.into_frame(), format, quality)
}

fn crop_region(source: &PreparedImage, rect: CropRect) -> PreparedImage {
    let stride = source.width as usize * 4;
    let row_len = rect.width as usize * 4;
    let mut out = Vec::with_capacity(row_len * rect.height as usize);
    for row in rect.y..rect.y + rect.height {
        let start = row as usize * stride + rect.x as usize * 4;
        out.extend_from_slice(&source.rgba8_premul[start..start + row_len]);
    }
    PreparedImage {
        width: rect.width,
        height: rect.height,
        rgba8_premul: std::sync::Arc::new(out),
    }
}
