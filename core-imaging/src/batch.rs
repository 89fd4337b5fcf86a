//! Bulk recompression
//!
//! Every image is dispatched at once; completion is tracked with a shared
//! counter. A failed image keeps its original data URL and is counted, it
//! never aborts the batch.

use crate::codec::ImageCodec;
use core_runtime::events::{CoreEvent, EventBus, ImagingEvent};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Result of a batch run, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedBatch {
    /// One data URL per input. Failed entries hold the original value.
    pub images: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
}

impl CompressedBatch {
    pub fn total(&self) -> usize {
        self.images.len()
    }
}

/// Recompress every `data:` URL in `images`.
///
/// `progress` is called with `(completed, total)` after each image finishes.
pub async fn compress_batch<F>(codec: &ImageCodec, images: Vec<String>, progress: F) -> CompressedBatch
where
    F: Fn(usize, usize) + Send + Sync,
{
    let total = images.len();
    let completed = AtomicUsize::new(0);

    let results = join_all(images.iter().enumerate().map(|(index, original)| {
        let completed = &completed;
        let progress = &progress;
        async move {
            let result = codec.recompress(original).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(done, total);
            if let Err(e) = &result {
                warn!(index, error = %e, "Image recompression failed; keeping original");
            }
            result
        }
    }))
    .await;

    let mut batch = CompressedBatch::default();
    for (result, original) in results.into_iter().zip(images) {
        match result {
            Ok(encoded) => {
                batch.succeeded += 1;
                batch.images.push(encoded.data_url);
            }
            Err(_) => {
                batch.failed += 1;
                batch.images.push(original);
            }
        }
    }

    info!(
        total,
        succeeded = batch.succeeded,
        failed = batch.failed,
        "Batch compression finished"
    );
    batch
}

/// [`compress_batch`] reporting progress and completion on the event bus.
pub async fn compress_batch_with_events(
    codec: &ImageCodec,
    images: Vec<String>,
    events: &EventBus,
) -> CompressedBatch {
    let batch = compress_batch(codec, images, |completed, total| {
        let _ = events.emit(CoreEvent::Imaging(ImagingEvent::CompressionProgress {
            completed,
            total,
        }));
    })
    .await;

    let _ = events.emit(CoreEvent::Imaging(ImagingEvent::CompressionCompleted {
        total: batch.total(),
        succeeded: batch.succeeded,
        failed: batch.failed,
    }));
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_url::encode_data_url;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    fn png_data_url(width: u32, height: u32) -> String {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([9, 9, 9])));
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        encode_data_url("image/png", &buffer)
    }

    #[tokio::test]
    async fn test_failures_keep_original_and_do_not_abort() {
        let codec = ImageCodec::default();
        let broken = "data:image/png;base64,AAAA".to_string();
        let images = vec![png_data_url(1200, 600), broken.clone(), png_data_url(10, 10)];
        let seen = Mutex::new(Vec::new());

        let batch = compress_batch(&codec, images, |completed, total| {
            seen.lock().unwrap().push((completed, total));
        })
        .await;

        assert_eq!(batch.total(), 3);
        assert_eq!(batch.succeeded, 2);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.images[1], broken);
        assert!(batch.images[0].starts_with("data:image/jpeg;base64,"));

        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = compress_batch(&ImageCodec::default(), Vec::new(), |_, _| {}).await;
        assert_eq!(batch, CompressedBatch::default());
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let batch =
            compress_batch_with_events(&ImageCodec::default(), vec![png_data_url(4, 4)], &bus)
                .await;
        assert_eq!(batch.succeeded, 1);

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Imaging(ImagingEvent::CompressionProgress {
                completed: 1,
                total: 1
            })
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Imaging(ImagingEvent::CompressionCompleted {
                total: 1,
                succeeded: 1,
                failed: 0
            })
        );
    }
}
