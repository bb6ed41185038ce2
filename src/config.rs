use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use crate::{
    encode::{DEFAULT_JPEG_QUALITY, ExportFormat},
    export::Platform,
    foundation::{
        core::Canvas,
        error::{GlassError, GlassResult},
    },
};

/// Runtime configuration, loadable from JSON. Every field has a default so partial files work.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlassConfig {
    /// Display surface the composite is rendered at.
    pub canvas: Canvas,
    pub format: ExportFormat,
    pub jpeg_quality: u8,
    pub load_timeout_ms: u64,
    pub platform: Platform,
    pub download_dir: PathBuf,
    pub download_file_name: String,
    pub album_dir: PathBuf,
    /// Longest side kept by the picker when compressed picks are requested.
    pub pick_max_edge: u32,
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::new(390, 844),
            format: ExportFormat::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            load_timeout_ms: 10_000,
            platform: Platform::Web,
            download_dir: PathBuf::from("."),
            download_file_name: "image.jpg".to_string(),
            album_dir: PathBuf::from("album"),
            pick_max_edge: 2048,
        }
    }
}

impl GlassConfig {
    pub fn from_json_path(path: &Path) -> GlassResult<Self> {
        let f = File::open(path)?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            GlassError::validation(format!("parse config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> GlassResult<()> {
        Canvas::checked(self.canvas.width, self.canvas.height)?;
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(GlassError::validation("jpeg_quality must be in 1..=100"));
        }
        if self.load_timeout_ms == 0 {
            return Err(GlassError::validation("load_timeout_ms must be > 0"));
        }
        let name = self.download_file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(GlassError::validation(
                "download_file_name must be a bare file name",
            ));
        }
        if self.pick_max_edge == 0 {
            return Err(GlassError::validation("pick_max_edge must be > 0"));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}
