use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use crate::{
    assets::{ImageRef, load_image},
    compositor::Compositor,
    config::GlassConfig,
    encode::{ExportFormat, encode_frame},
    foundation::{
        core::{Canvas, Rgba8},
        error::{GlassError, GlassResult},
    },
    render_cpu::Surface,
};

/// Size of the album export surface.
pub const ALBUM_CANVAS: Canvas = Canvas::new(960, 1280);
/// Backdrop painted under the album export.
pub const ALBUM_BACKDROP: Rgba8 = Rgba8::opaque(0x66, 0x7e, 0xea);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Web,
    MiniProgram,
}

/// Images an export works from.
#[derive(Clone, Copy, Debug)]
pub struct ExportRequest<'a> {
    pub source: &'a ImageRef,
    pub cropped: &'a ImageRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReceipt {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait Exporter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn export(
        &self,
        request: ExportRequest<'_>,
        compositor: &Compositor,
    ) -> GlassResult<ExportReceipt>;
}

/// Pick the exporter for `cfg.platform`. Done once at startup.
pub fn exporter_for(cfg: &GlassConfig) -> Box<dyn Exporter> {
    match cfg.platform {
        Platform::Web => Box::new(DownloadExporter {
            dir: cfg.download_dir.clone(),
            file_name: cfg.download_file_name.clone(),
        }),
        Platform::MiniProgram => Box::new(AlbumExporter {
            album_dir: cfg.album_dir.clone(),
            quality: cfg.jpeg_quality,
            temp_dir: None,
        }),
    }
}

/// Web: composite source and crop, then "download" the file under a fixed name.
#[derive(Clone, Debug)]
pub struct DownloadExporter {
    pub dir: PathBuf,
    pub file_name: String,
}

#[async_trait]
impl Exporter for DownloadExporter {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    #[tracing::instrument(skip_all, fields(dir = %self.dir.display()))]
    async fn export(
        &self,
        request: ExportRequest<'_>,
        compositor: &Compositor,
    ) -> GlassResult<ExportReceipt> {
        let Some(encoded) = compositor
            .compose(request.source, Some(request.cropped))
            .await?
        else {
            return Err(GlassError::export("no drawing surface for the composite"));
        };

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&self.file_name);
        std::fs::write(&path, &encoded.bytes)?;
        tracing::info!(path = %path.display(), "download written");
        Ok(ExportReceipt {
            path,
            bytes_written: encoded.bytes.len() as u64,
            width: encoded.width,
            height: encoded.height,
        })
    }
}

/// Mini-program: draw the crop onto a fixed 960x1280 surface, write it to a temp file, then
/// save that file into the album.
#[derive(Clone, Debug)]
pub struct AlbumExporter {
    pub album_dir: PathBuf,
    pub quality: u8,
    /// Where the intermediate JPEG is written; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
}

#[async_trait]
impl Exporter for AlbumExporter {
    fn platform(&self) -> Platform {
        Platform::MiniProgram
    }

    #[tracing::instrument(skip_all, fields(album = %self.album_dir.display()))]
    async fn export(
        &self,
        request: ExportRequest<'_>,
        compositor: &Compositor,
    ) -> GlassResult<ExportReceipt> {
        let cropped = load_image(request.cropped, compositor.load_timeout).await?;

        let Some(mut surface) = Surface::acquire(ALBUM_CANVAS) else {
            return Err(GlassError::export("no drawing surface for the album canvas"));
        };
        surface.fill(ALBUM_BACKDROP, 1.0)?;
        surface.draw_image(&cropped, ALBUM_CANVAS.bounds(), None)?;
        let encoded = encode_frame(&surface.into_frame(), ExportFormat::Jpeg, self.quality)?;

        let temp = self
            .write_temp(&encoded.bytes)
            .map_err(|e| GlassError::generate(format!("canvas to temp file: {e}")))?;

        let path = save_to_album(temp.path(), &self.album_dir)?;
        tracing::info!(path = %path.display(), "saved to album");
        Ok(ExportReceipt {
            path,
            bytes_written: encoded.bytes.len() as u64,
            width: encoded.width,
            height: encoded.height,
        })
    }
}

impl AlbumExporter {
    fn write_temp(&self, bytes: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("glasscrop-").suffix(".jpg");
        let mut temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        temp.write_all(bytes)?;
        temp.flush()?;
        Ok(temp)
    }
}

/// Copy `file` into `album_dir` under the first free `IMG_nnnn.jpg` name. A partially
/// written copy is removed again.
fn save_to_album(file: &Path, album_dir: &Path) -> GlassResult<PathBuf> {
    std::fs::create_dir_all(album_dir)?;
    let mut input = std::fs::File::open(file)?;
    for n in 1..=9999u32 {
        let candidate = album_dir.join(format!("IMG_{n:04}.jpg"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut out) => {
                if let Err(e) = std::io::copy(&mut input, &mut out) {
                    drop(out);
                    if let Err(rm) = std::fs::remove_file(&candidate) {
                        tracing::warn!(
                            path = %candidate.display(),
                            error = %rm,
                            "could not remove partial album file"
                        );
                    }
                    return Err(e.into());
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(GlassError::export(format!(
        "album '{}' has no free file names",
        album_dir.display()
    )))
}
