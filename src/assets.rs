use std::{
    path::PathBuf,
    sync::Arc,
};

pub mod decode;
pub mod load;

pub use decode::decode_image;
pub use load::{load_image, load_image_blocking, timed};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Build a single-color image, mostly useful for backdrops and tests.
    pub fn solid(width: u32, height: u32, premul: [u8; 4]) -> Self {
        Self {
            width,
            height,
            rgba8_premul: Arc::new(premul.repeat(width as usize * height as usize)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Where the bytes of an image live.
///
/// Paths correspond to platform temp files (picker results, album exports); encoded buffers
/// correspond to in-memory blobs such as crop results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageRef {
    Path(PathBuf),
    Encoded(Arc<[u8]>),
}

impl ImageRef {
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    pub fn encoded(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Encoded(bytes.into())
    }

    /// Short human-readable label for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Encoded(b) => format!("<{} encoded bytes>", b.len()),
        }
    }
}
