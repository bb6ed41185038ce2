use std::{collections::VecDeque, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use glasscrop::{
    AlbumExporter, Canvas, Compositor, CropRect, DownloadExporter, ExportReceipt, Exporter,
    GlassError, GlassResult, ImagePicker, ImageRef, PageController, Phase, PickOptions, Platform,
    RecordingNotifier, Toast, ToastIcon, export::ExportRequest,
};

struct ScriptedPicker {
    picks: VecDeque<GlassResult<ImageRef>>,
}

impl ScriptedPicker {
    fn new(picks: impl IntoIterator<Item = GlassResult<ImageRef>>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }
}

impl ImagePicker for ScriptedPicker {
    fn choose(&mut self, _opts: &PickOptions) -> GlassResult<ImageRef> {
        self.picks
            .pop_front()
            .unwrap_or_else(|| Err(GlassError::validation("cancelled")))
    }
}

struct FailingExporter;

#[async_trait]
impl Exporter for FailingExporter {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    async fn export(
        &self,
        _request: ExportRequest<'_>,
        _compositor: &Compositor,
    ) -> GlassResult<ExportReceipt> {
        Err(GlassError::export("album permission denied"))
    }
}

fn png(w: u32, h: u32, rgb: [u8; 3]) -> ImageRef {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb(rgb));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageRef::encoded(buf)
}

/// Left half red, right half blue.
fn split_png(w: u32, h: u32) -> ImageRef {
    let img = image::RgbImage::from_fn(w, h, |x, _| {
        if x < w / 2 {
            image::Rgb([230, 20, 20])
        } else {
            image::Rgb([20, 20, 230])
        }
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageRef::encoded(buf)
}

fn page(
    picks: impl IntoIterator<Item = GlassResult<ImageRef>>,
    exporter: Box<dyn Exporter>,
) -> (PageController, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let controller = PageController::new(
        Compositor::new(Canvas::new(48, 64)),
        Box::new(ScriptedPicker::new(picks)),
        exporter,
        Arc::new(notifier.clone()),
    );
    (controller, notifier)
}

fn download_to(dir: PathBuf) -> Box<dyn Exporter> {
    Box::new(DownloadExporter {
        dir,
        file_name: "image.jpg".to_string(),
    })
}

#[tokio::test]
async fn pick_crop_save_download() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, toasts) = page([Ok(png(30, 40, [10, 120, 200]))], download_to(dir.path().to_path_buf()));

    let ticket = page.select_image().unwrap();
    assert_eq!(page.phase(), Phase::Cropping);
    assert!(page.refresh_preview(&ticket).await.unwrap());
    assert!(page.state().preview.is_some());

    let crop_ticket = page.confirm_crop(CropRect::new(0, 0, 30, 40)).await.unwrap();
    assert_eq!(crop_ticket.generation, ticket.generation);
    assert_eq!(
        page.state().cropped.as_ref().map(|c| c.source_generation),
        Some(ticket.generation)
    );
    assert_eq!(page.phase(), Phase::Ready);
    assert!(page.refresh_preview(&crop_ticket).await.unwrap());

    let receipt = page.save().await.unwrap();
    assert_eq!(page.phase(), Phase::Ready);
    assert_eq!(receipt.path, dir.path().join("image.jpg"));
    assert_eq!((receipt.width, receipt.height), (48, 64));
    let saved = image::open(&receipt.path).unwrap();
    assert_eq!((saved.width(), saved.height()), (48, 64));
    assert_eq!(toasts.last(), Some(Toast::success("saved")));
}

#[tokio::test]
async fn album_export_is_960_by_1280() {
    let dir = tempfile::tempdir().unwrap();
    let album = dir.path().join("album");
    let exporter = Box::new(AlbumExporter {
        album_dir: album.clone(),
        quality: 90,
        temp_dir: None,
    });
    let (mut page, toasts) = page([Ok(png(12, 16, [200, 30, 30]))], exporter);

    page.select_image().unwrap();
    page.confirm_crop(CropRect::new(0, 0, 12, 16)).await.unwrap();
    let receipt = page.save().await.unwrap();

    assert!(receipt.path.starts_with(&album));
    let saved = image::open(&receipt.path).unwrap();
    assert_eq!((saved.width(), saved.height()), (960, 1280));
    assert_eq!(toasts.last().map(|t| t.icon), Some(ToastIcon::Success));
}

#[tokio::test]
async fn failed_pick_toasts_and_keeps_phase() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, toasts) = page(
        [Err(GlassError::validation("user cancelled"))],
        download_to(dir.path().to_path_buf()),
    );
    assert!(page.select_image().is_err());
    assert_eq!(page.phase(), Phase::Idle);
    assert_eq!(toasts.toasts(), vec![Toast::plain("image selection failed")]);
}

#[tokio::test]
async fn failed_save_toasts_and_returns_to_ready() {
    let (mut page, toasts) = page([Ok(png(6, 8, [1, 2, 3]))], Box::new(FailingExporter));
    page.select_image().unwrap();
    page.confirm_crop(CropRect::new(0, 0, 6, 8)).await.unwrap();

    let err = page.save().await.unwrap_err();
    assert!(matches!(err, GlassError::Export(_)));
    assert_eq!(page.phase(), Phase::Ready);
    assert_eq!(toasts.last(), Some(Toast::plain("save failed")));
}

#[tokio::test]
async fn bad_crop_stays_in_cropping() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, toasts) = page([Ok(png(6, 8, [1, 2, 3]))], download_to(dir.path().to_path_buf()));
    page.select_image().unwrap();
    assert!(page.confirm_crop(CropRect::new(4, 4, 6, 8)).await.is_err());
    assert_eq!(page.phase(), Phase::Cropping);
    assert!(page.state().cropped.is_none());
    assert_eq!(toasts.last(), Some(Toast::plain("crop failed")));
}

#[tokio::test]
async fn stale_preview_is_discarded_after_reselect() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, _) = page(
        [Ok(png(8, 8, [255, 0, 0])), Ok(png(8, 8, [0, 0, 255]))],
        download_to(dir.path().to_path_buf()),
    );

    let first = page.select_image().unwrap();
    let first_preview = page.render_preview(&first).await.unwrap();
    page.cancel_crop().unwrap();
    let second = page.select_image().unwrap();
    assert!(second.generation > first.generation);

    assert!(!page.apply_preview(&first, first_preview));
    assert!(page.state().preview.is_none());

    let second_preview = page.render_preview(&second).await.unwrap();
    assert!(page.apply_preview(&second, second_preview));
    assert!(page.state().preview.is_some());
}

#[tokio::test]
async fn reselect_from_ready_resets_crop() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, _) = page(
        [Ok(png(6, 8, [9, 9, 9])), Ok(png(6, 8, [90, 90, 90]))],
        download_to(dir.path().to_path_buf()),
    );
    page.select_image().unwrap();
    page.confirm_crop(CropRect::new(0, 0, 3, 4)).await.unwrap();
    assert_eq!(page.phase(), Phase::Ready);

    let ticket = page.select_image().unwrap();
    assert_eq!(page.phase(), Phase::Cropping);
    assert!(page.state().cropped.is_none());
    assert_eq!(page.state().source.as_ref().map(|s| s.generation), Some(ticket.generation));
}

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, _) = page([Ok(png(6, 8, [9, 9, 9]))], download_to(dir.path().to_path_buf()));

    assert!(matches!(page.save().await, Err(GlassError::InvalidTransition { .. })));
    assert!(matches!(page.clear(), Err(GlassError::InvalidTransition { .. })));
    assert!(matches!(page.cancel_crop(), Err(GlassError::InvalidTransition { .. })));
    assert!(matches!(
        page.confirm_crop(CropRect::new(0, 0, 1, 1)).await,
        Err(GlassError::InvalidTransition { .. })
    ));
    assert_eq!(page.phase(), Phase::Idle);

    page.select_image().unwrap();
    assert!(matches!(page.clear(), Err(GlassError::InvalidTransition { .. })));
    page.confirm_crop(CropRect::new(0, 0, 3, 4)).await.unwrap();
    page.clear().unwrap();
    assert_eq!(page.phase(), Phase::Idle);
    assert!(page.state().source.is_none());
    assert!(page.state().cropped.is_none());
}

#[tokio::test]
async fn crop_becomes_the_glass_background() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, _) = page([Ok(split_png(200, 100))], download_to(dir.path().to_path_buf()));

    page.select_image().unwrap();
    let ticket = page.confirm_crop(CropRect::new(125, 0, 75, 100)).await.unwrap();
    assert_eq!(page.state().source.as_ref().map(|s| &s.image), Some(&ticket.background));

    assert!(page.refresh_preview(&ticket).await.unwrap());
    let preview = page.state().preview.clone().unwrap();
    let preview = image::load_from_memory(&preview.bytes).unwrap().to_rgb8();
    let [r, _, b] = preview.get_pixel(0, 32).0;
    assert!(u16::from(b) > u16::from(r) + 100, "preview edge {r},{b}");

    let receipt = page.save().await.unwrap();
    let saved = image::open(&receipt.path).unwrap().to_rgb8();
    for y in [0, 32, 63] {
        let [r, _, b] = saved.get_pixel(0, y).0;
        assert!(u16::from(b) > u16::from(r) + 100, "export edge at y={y}: {r},{b}");
    }
}

#[tokio::test]
async fn precrop_preview_is_discarded_after_crop() {
    let dir = tempfile::tempdir().unwrap();
    let (mut page, _) = page([Ok(split_png(40, 40))], download_to(dir.path().to_path_buf()));

    let picked = page.select_image().unwrap();
    let uncropped_preview = page.render_preview(&picked).await.unwrap();
    let cropped = page.confirm_crop(CropRect::new(20, 0, 15, 20)).await.unwrap();
    assert_eq!(cropped.generation, picked.generation);

    assert!(!page.apply_preview(&picked, uncropped_preview));
    assert!(page.state().preview.is_none());
    assert!(page.refresh_preview(&cropped).await.unwrap());
    assert!(page.state().preview.is_some());
}

#[tokio::test]
async fn temp_file_failure_has_its_own_toast() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Box::new(AlbumExporter {
        album_dir: dir.path().join("album"),
        quality: 90,
        temp_dir: Some(dir.path().join("no").join("such").join("dir")),
    });
    let (mut page, toasts) = page([Ok(png(6, 8, [40, 50, 60]))], exporter);
    page.select_image().unwrap();
    page.confirm_crop(CropRect::new(0, 0, 6, 8)).await.unwrap();

    let err = page.save().await.unwrap_err();
    assert!(matches!(err, GlassError::Generate(_)));
    assert_eq!(page.phase(), Phase::Ready);
    assert_eq!(toasts.last(), Some(Toast::plain("failed to generate image")));
}
