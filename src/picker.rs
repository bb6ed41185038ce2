use std::{collections::VecDeque, io::Cursor, path::PathBuf};

use crate::{
    assets::ImageRef,
    foundation::error::{GlassError, GlassResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeType {
    Original,
    Compressed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceType {
    Album,
    Camera,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickOptions {
    pub count: u32,
    pub size: SizeType,
    pub sources: Vec<SourceType>,
    /// Longest side kept when `size` is `Compressed`.
    pub max_edge: u32,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            count: 1,
            size: SizeType::Compressed,
            sources: vec![SourceType::Album, SourceType::Camera],
            max_edge: 2048,
        }
    }
}

/// Platform image picker.
pub trait ImagePicker: Send {
    fn choose(&mut self, opts: &PickOptions) -> GlassResult<ImageRef>;
}

/// Picker over a queue of files, one per call; stands in for the album dialog on the CLI.
#[derive(Debug, Default)]
pub struct FilePicker {
    queue: VecDeque<PathBuf>,
}

impl FilePicker {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            queue: paths.into_iter().collect(),
        }
    }
}

impl ImagePicker for FilePicker {
    #[tracing::instrument(skip(self))]
    fn choose(&mut self, opts: &PickOptions) -> GlassResult<ImageRef> {
        if opts.count != 1 {
            return Err(GlassError::validation("only single-image picks are supported"));
        }
        let Some(path) = self.queue.pop_front() else {
            return Err(GlassError::validation("no image chosen"));
        };
        if !path.is_file() {
            return Err(GlassError::validation(format!(
                "'{}' is not a file",
                path.display()
            )));
        }
        if opts.size == SizeType::Original {
            return Ok(ImageRef::Path(path));
        }

        let (w, h) = image::image_dimensions(&path)
            .map_err(|e| GlassError::decode(format!("probe '{}': {e}", path.display())))?;
        if w.max(h) <= opts.max_edge {
            return Ok(ImageRef::Path(path));
        }

        let img = image::open(&path)
            .map_err(|e| GlassError::decode(format!("open '{}': {e}", path.display())))?;
        let small = img.resize(opts.max_edge, opts.max_edge, image::imageops::FilterType::Triangle);
        tracing::debug!(from = ?(w, h), to = ?(small.width(), small.height()), "compressed pick");
        let mut bytes = Vec::new();
        small
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .map_err(|e| GlassError::encode(format!("compress pick: {e}")))?;
        Ok(ImageRef::encoded(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &std::path::Path, name: &str, w: u32, h: u32) -> PathBuf {
        let p = dir.join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb([9, 9, 9]))
            .save(&p)
            .unwrap();
        p
    }

    #[test]
    fn small_pick_passes_path_through() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_png(dir.path(), "a.png", 8, 6);
        let mut picker = FilePicker::new([p.clone()]);
        assert_eq!(picker.choose(&PickOptions::default()).unwrap(), ImageRef::Path(p));
    }

    #[test]
    fn large_pick_is_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_png(dir.path(), "big.png", 40, 20);
        let mut picker = FilePicker::new([p]);
        let opts = PickOptions {
            max_edge: 10,
            ..PickOptions::default()
        };
        let ImageRef::Encoded(bytes) = picker.choose(&opts).unwrap() else {
            panic!("expected an encoded pick");
        };
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (10, 5));
    }

    #[test]
    fn empty_queue_and_missing_files_fail() {
        let mut picker = FilePicker::new([PathBuf::from("/nope/x.png")]);
        assert!(picker.choose(&PickOptions::default()).is_err());
        assert!(picker.choose(&PickOptions::default()).is_err());
    }
}
