use std::{future::Future, time::Duration};

use crate::{
    assets::{ImageRef, PreparedImage, decode::decode_image},
    foundation::error::{GlassError, GlassResult},
};

/// Read and decode an image on the current thread.
pub fn load_image_blocking(image: &ImageRef) -> GlassResult<PreparedImage> {
    match image {
        ImageRef::Path(p) => {
            let bytes = std::fs::read(p).map_err(|e| {
                GlassError::decode(format!("read image '{}': {e}", p.display()))
            })?;
            decode_image(&bytes)
        }
        ImageRef::Encoded(bytes) => decode_image(bytes),
    }
}

/// Decode `image` off the async executor, failing with [`GlassError::Timeout`] when it takes
/// longer than `timeout`. Dropping the returned future abandons the load.
#[tracing::instrument(skip(image), fields(image = %image.describe()))]
pub async fn load_image(image: &ImageRef, timeout: Duration) -> GlassResult<PreparedImage> {
    let owned = image.clone();
    let task = tokio::task::spawn_blocking(move || load_image_blocking(&owned));
    let joined = timed(format!("load image {}", image.describe()), timeout, task).await?;
    let prepared = joined.map_err(|e| GlassError::Other(anyhow::anyhow!("image load task: {e}")))??;
    tracing::debug!(
        width = prepared.width,
        height = prepared.height,
        "image loaded"
    );
    Ok(prepared)
}

/// Await `fut`, mapping an elapsed deadline to [`GlassError::Timeout`].
pub async fn timed<F, T>(what: impl Into<String>, timeout: Duration, fut: F) -> GlassResult<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(v) => Ok(v),
        Err(_) => {
            let what = what.into();
            tracing::warn!(what = %what, timeout_ms = timeout.as_millis() as u64, "deadline elapsed");
            Err(GlassError::timeout(what, timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn load_encoded_ref() {
        let img = ImageRef::encoded(png_bytes(3, 2));
        let prepared = load_image(&img, Duration::from_secs(5)).await.unwrap();
        assert_eq!((prepared.width, prepared.height), (3, 2));
    }

    #[tokio::test]
    async fn missing_path_is_a_decode_error() {
        let img = ImageRef::path("/definitely/not/here.png");
        let err = load_image(&img, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, GlassError::Decode(_)));
    }

    #[tokio::test]
    async fn pending_future_times_out() {
        let err = timed(
            "never resolves",
            Duration::from_millis(10),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GlassError::Timeout { timeout_ms: 10, .. }));
    }
}
