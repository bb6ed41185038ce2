use std::f64::consts::FRAC_PI_2;

use kurbo::{Arc, BezPath, Point, Rect, Vec2};

use crate::foundation::core::Canvas;

/// Fraction of the canvas width taken by the foreground.
pub const FOREGROUND_WIDTH_FRACTION: f64 = 0.8;
/// Foreground aspect as width:height.
pub const FOREGROUND_ASPECT: (u32, u32) = (3, 4);
/// Corner radius of the foreground clip, in pixels.
pub const CORNER_RADIUS_PX: f64 = 40.0;

const ARC_TOLERANCE: f64 = 0.05;

/// Portrait 3:4 rectangle, 80% of the canvas width, centered on the canvas.
///
/// Height follows from width only, so on short canvases the rectangle overflows and `y0` goes
/// negative; margins stay symmetric either way.
pub fn foreground_rect(canvas: Canvas) -> Rect {
    let (aw, ah) = FOREGROUND_ASPECT;
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let fg_w = w * FOREGROUND_WIDTH_FRACTION;
    let fg_h = fg_w * f64::from(ah) / f64::from(aw);
    let x = (w - fg_w) / 2.0;
    let y = (h - fg_h) / 2.0;
    Rect::new(x, y, x + fg_w, y + fg_h)
}

/// Closed rounded-rectangle outline: four straight edges joined by quarter-circle corners.
///
/// `radius` is clamped to half of the shorter side; a zero radius gives a plain rectangle.
pub fn rounded_rect_path(rect: Rect, radius: f64) -> BezPath {
    let rect = rect.abs();
    let r = radius
        .max(0.0)
        .min(rect.width() / 2.0)
        .min(rect.height() / 2.0);
    let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);

    let mut path = BezPath::new();
    path.move_to((x0 + r, y0));
    path.line_to((x1 - r, y0));
    corner(&mut path, Point::new(x1 - r, y0 + r), r, -FRAC_PI_2);
    path.line_to((x1, y1 - r));
    corner(&mut path, Point::new(x1 - r, y1 - r), r, 0.0);
    path.line_to((x0 + r, y1));
    corner(&mut path, Point::new(x0 + r, y1 - r), r, FRAC_PI_2);
    path.line_to((x0, y0 + r));
    corner(&mut path, Point::new(x0 + r, y0 + r), r, 2.0 * FRAC_PI_2);
    path.close_path();
    path
}

fn corner(path: &mut BezPath, center: Point, r: f64, start_angle: f64) {
    if r <= 0.0 {
        return;
    }
    let arc = Arc::new(center, Vec2::new(r, r), start_angle, FRAC_PI_2, 0.0);
    arc.to_cubic_beziers(ARC_TOLERANCE, |p1, p2, p| path.curve_to(p1, p2, p));
}
