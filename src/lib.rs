//! glasscrop crops a photo to a 3:4 card and composites it over a "liquid glass" rendition of
//! itself: blurred, brightened, saturated and washed with white and light blue.
//!
//! The pieces:
//!
//! - [`Compositor`] renders the preview (background only) and the final composite.
//! - [`PageController`] drives pick, crop, save and clear as an explicit state machine.
//! - [`Exporter`] is the platform seam: a file download on web, an album save on mini-program.
#![forbid(unsafe_code)]

pub mod assets;
pub mod blur_cpu;
pub mod composite_cpu;
pub mod compositor;
pub mod config;
pub mod crop;
pub mod encode;
pub mod export;
mod foundation;
pub mod fx;
pub mod geometry;
pub mod notify;
pub mod picker;
pub mod render_cpu;
pub mod session;

pub use crate::foundation::core::{Affine, BezPath, Canvas, Point, Rect, Rgba8, Vec2};
pub use crate::foundation::error::{GlassError, GlassResult};

pub use assets::{ImageRef, PreparedImage};
pub use compositor::Compositor;
pub use config::GlassConfig;
pub use crop::{Aspect, CropRect};
pub use encode::{EncodedImage, ExportFormat};
pub use export::{AlbumExporter, DownloadExporter, ExportReceipt, Exporter, Platform, exporter_for};
pub use fx::LiquidGlass;
pub use geometry::{foreground_rect, rounded_rect_path};
pub use notify::{Notifier, RecordingNotifier, Toast, ToastIcon, TracingNotifier};
pub use picker::{FilePicker, ImagePicker, PickOptions};
pub use render_cpu::{Frame, Surface};
pub use session::{PageController, PageState, Phase, PreviewTicket};
