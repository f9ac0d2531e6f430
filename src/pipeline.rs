use crate::detection::{DetectionOutcome, LaneDetector, Mask};
use crate::error::{LaneError, Result};
use crate::media::{FfmpegVideoReader, FfmpegVideoWriter, Fourcc, VideoSink, VideoSource};
use image::{imageops, DynamicImage, RgbImage};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "m4v"];

/// Where a run writes its results
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub image_dir: PathBuf,
    pub video_dir: PathBuf,
    pub mask_dir: PathBuf,
    /// Extension for still outputs, without the dot
    pub image_ext: String,
    pub fourcc: Fourcc,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("results/images"),
            video_dir: PathBuf::from("results/videos"),
            mask_dir: PathBuf::from("results/masks"),
            image_ext: "jpg".to_string(),
            fourcc: Fourcc::MP4V,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Decide how to process a file from its extension
pub fn classify(path: &Path) -> Result<MediaKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(LaneError::InvalidInput(format!(
            "unsupported file type: {}",
            path.display()
        )))
    }
}

/// Timestamp used to qualify output names, e.g. `20240131_142501`
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Create the directory if it doesn't exist
pub fn ensure_directory(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| LaneError::resource(path, e))
}

/// Annotated and mask output paths for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub annotated: PathBuf,
    pub mask: PathBuf,
}

pub fn output_paths(
    annotated_dir: &Path,
    mask_dir: &Path,
    input: &Path,
    timestamp: &str,
    ext: &str,
) -> OutputPaths {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    OutputPaths {
        annotated: annotated_dir.join(format!("detected_lane_{stem}_{timestamp}.{ext}")),
        mask: mask_dir.join(format!("lane_mask_{stem}_{timestamp}.{ext}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    pub outputs: OutputPaths,
    pub degraded: bool,
}

/// Detect lanes in one still image and write the annotated image and mask
pub fn process_image(
    detector: &LaneDetector,
    input: &Path,
    settings: &OutputSettings,
    timestamp: &str,
) -> Result<ImageReport> {
    tracing::info!("Processing image {}", input.display());

    let image = load_color_image(input)?;

    let detection = detector.detect_lane(&image);
    let degraded = match &detection.outcome {
        DetectionOutcome::Degraded { reason } => {
            tracing::error!("Detection degraded for {}: {}", input.display(), reason);
            true
        }
        DetectionOutcome::Detected { lane_pixels } => {
            tracing::info!("Found {} lane pixels", lane_pixels);
            false
        }
    };

    let outputs = output_paths(
        &settings.image_dir,
        &settings.mask_dir,
        input,
        timestamp,
        &settings.image_ext,
    );

    ensure_directory(&settings.image_dir)?;
    ensure_directory(&settings.mask_dir)?;
    detection.annotated.save(&outputs.annotated)?;
    detection.mask.save(&outputs.mask)?;

    tracing::info!("Image saved at: {}", outputs.annotated.display());
    tracing::info!("Mask saved at: {}", outputs.mask.display());

    Ok(ImageReport { outputs, degraded })
}

/// Read a still image as an 8-bit 3-channel frame
///
/// Gray, gray+alpha and RGBA files are expanded or flattened to RGB the way
/// a color-mode image loader does, so every decodable still reaches the
/// detector as a valid frame.
pub fn load_color_image(input: &Path) -> Result<DynamicImage> {
    let image = image::open(input).map_err(|e| {
        LaneError::InvalidInput(format!("could not read image from {}: {e}", input.display()))
    })?;

    Ok(match image {
        DynamicImage::ImageRgb8(_) => image,
        other => {
            tracing::debug!(
                "Converting {} from {:?} to RGB",
                input.display(),
                other.color()
            );
            DynamicImage::ImageRgb8(other.to_rgb8())
        }
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoReport {
    pub frames: u64,
    pub degraded_frames: u64,
    /// Decoding stopped early on a read error
    pub truncated: bool,
}

/// Run detection over every frame of `source`, writing annotated frames and
/// masks in source order
///
/// A degraded frame is logged and its fallback output written. A read error
/// ends the stream early. A write error stops the unit of work. Both sinks
/// are finished on every path.
pub fn process_video<S, A, M>(
    detector: &LaneDetector,
    source: &mut S,
    annotated_sink: &mut A,
    mask_sink: &mut M,
) -> Result<VideoReport>
where
    S: VideoSource,
    A: VideoSink,
    M: VideoSink,
{
    let _span = tracing::info_span!("video").entered();

    let (width, height) = source.resolution();
    let mut report = VideoReport::default();
    let mut failure: Option<LaneError> = None;

    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading frame {}: {}", report.frames, e);
                report.truncated = true;
                break;
            }
        };

        let frame = if frame.dimensions() != (width, height) {
            tracing::debug!(
                "Frame {} is {:?}, resizing to {}x{}",
                report.frames,
                frame.dimensions(),
                width,
                height
            );
            imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
        } else {
            frame
        };

        let (annotated, mask, outcome) = detector.detect_frame(frame);
        if let DetectionOutcome::Degraded { reason } = &outcome {
            tracing::error!("Error processing frame {}: {}", report.frames, reason);
            report.degraded_frames += 1;
        }

        let written = annotated_sink
            .write_frame(&annotated)
            .and_then(|_| mask_sink.write_frame(&mask_to_rgb(&mask)));
        if let Err(e) = written {
            failure = Some(e);
            break;
        }

        report.frames += 1;
        if report.frames % 100 == 0 {
            tracing::debug!("Processed {} frames", report.frames);
        }
    }

    let finished_annotated = annotated_sink.finish();
    let finished_mask = mask_sink.finish();

    if let Some(e) = failure {
        return Err(e);
    }
    finished_annotated?;
    finished_mask?;

    Ok(report)
}

/// Expand a mask to three identical channels for color encoders
pub fn mask_to_rgb(mask: &Mask) -> RgbImage {
    DynamicImage::ImageLuma8(mask.clone()).to_rgb8()
}

/// Open a video file, set up both encoders and process it
pub fn process_video_file(
    detector: &LaneDetector,
    input: &Path,
    settings: &OutputSettings,
    timestamp: &str,
) -> Result<(VideoReport, OutputPaths)> {
    tracing::info!("Processing video {}", input.display());

    let mut reader = FfmpegVideoReader::open(input)?;
    let size = reader.resolution();
    let fps = reader.fps();

    let outputs = output_paths(&settings.video_dir, &settings.video_dir, input, timestamp, "mp4");
    ensure_directory(&settings.video_dir)?;

    let (mut annotated, mut mask) = open_sink_pair(&outputs, |path| {
        FfmpegVideoWriter::create(path, settings.fourcc, fps, size)
    })?;

    let report = process_video(detector, &mut reader, &mut annotated, &mut mask)?;

    tracing::info!(
        "Video saved at: {} ({} of {} decoded frames)",
        outputs.annotated.display(),
        annotated.frames_written(),
        reader.frames_read()
    );
    tracing::info!(
        "Mask video saved at: {} ({} frames)",
        outputs.mask.display(),
        mask.frames_written()
    );

    Ok((report, outputs))
}

/// Create the annotated and mask sinks together. If the second one can't be
/// created the first is discarded so no empty container is left behind.
pub fn open_sink_pair<W, F>(outputs: &OutputPaths, mut create: F) -> Result<(W, W)>
where
    W: VideoSink,
    F: FnMut(&Path) -> Result<W>,
{
    let mut annotated = create(&outputs.annotated)?;
    match create(&outputs.mask) {
        Ok(mask) => Ok((annotated, mask)),
        Err(e) => {
            if let Err(cleanup) = annotated.discard() {
                tracing::warn!(
                    "Could not remove {}: {}",
                    outputs.annotated.display(),
                    cleanup
                );
            }
            Err(e)
        }
    }
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub images_ok: usize,
    pub images_failed: usize,
    pub images_degraded: usize,
    pub videos_ok: usize,
    pub videos_failed: usize,
    pub frames_written: u64,
    pub frames_degraded: u64,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn log(&self) {
        tracing::info!(
            "Images: {} ok ({} degraded), {} failed",
            self.images_ok,
            self.images_degraded,
            self.images_failed
        );
        tracing::info!(
            "Videos: {} ok, {} failed, {} frames written ({} degraded)",
            self.videos_ok,
            self.videos_failed,
            self.frames_written,
            self.frames_degraded
        );
        if self.skipped > 0 {
            tracing::warn!("Skipped {} unsupported inputs", self.skipped);
        }
    }
}

/// Process every input in order. Failures are logged per file and never
/// stop the batch.
pub fn run_batch(
    detector: &LaneDetector,
    inputs: &[PathBuf],
    settings: &OutputSettings,
) -> BatchSummary {
    let timestamp = run_timestamp();
    let mut summary = BatchSummary::default();

    for input in inputs {
        let kind = match classify(input) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::error!("{}", e);
                summary.skipped += 1;
                continue;
            }
        };

        match kind {
            MediaKind::Image => match process_image(detector, input, settings, &timestamp) {
                Ok(report) => {
                    summary.images_ok += 1;
                    if report.degraded {
                        summary.images_degraded += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("Error during image processing of {}: {}", input.display(), e);
                    summary.images_failed += 1;
                }
            },
            MediaKind::Video => match process_video_file(detector, input, settings, &timestamp) {
                Ok((report, _)) => {
                    if report.truncated {
                        tracing::warn!(
                            "{} ended early after {} frames",
                            input.display(),
                            report.frames
                        );
                    }
                    summary.videos_ok += 1;
                    summary.frames_written += report.frames;
                    summary.frames_degraded += report.degraded_frames;
                }
                Err(e) => {
                    tracing::error!("Error during video processing of {}: {}", input.display(), e);
                    summary.videos_failed += 1;
                }
            },
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlendParams;
    use crate::detection::{Preprocess, Preprocessed};
    use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};
    use std::collections::VecDeque;

    const YELLOW: Rgb<u8> = Rgb([200, 148, 43]);

    struct MemorySource {
        frames: VecDeque<Result<RgbImage>>,
        resolution: (u32, u32),
    }

    impl MemorySource {
        fn new(frames: Vec<RgbImage>) -> Self {
            let resolution = frames[0].dimensions();
            Self {
                frames: frames.into_iter().map(Ok).collect(),
                resolution,
            }
        }
    }

    impl VideoSource for MemorySource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            self.frames.pop_front().transpose()
        }

        fn resolution(&self) -> (u32, u32) {
            self.resolution
        }

        fn fps(&self) -> f64 {
            25.0
        }
    }

    #[derive(Default)]
    struct MemorySink {
        frames: Vec<RgbImage>,
        finished: bool,
        fail_after: Option<usize>,
    }

    impl VideoSink for MemorySink {
        fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
            if self.fail_after == Some(self.frames.len()) {
                return Err(LaneError::Video("disk full".into()));
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }

        fn discard(&mut self) -> Result<()> {
            self.frames.clear();
            Ok(())
        }
    }

    /// Sink backed by a file on disk, created eagerly like an encoder output
    struct FileSink {
        path: PathBuf,
    }

    impl VideoSink for FileSink {
        fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            Ok(())
        }

        fn discard(&mut self) -> Result<()> {
            std::fs::remove_file(&self.path).map_err(|e| LaneError::resource(&self.path, e))
        }
    }

    /// Fails on frames whose top-left pixel is pure red
    struct PickyPreprocessor;

    impl Preprocess for PickyPreprocessor {
        fn preprocess(&self, frame: &DynamicImage) -> Result<Preprocessed> {
            let rgb = frame.to_rgb8();
            if *rgb.get_pixel(0, 0) == Rgb([255, 0, 0]) {
                return Err(LaneError::Detection("red frame".into()));
            }
            Ok(Preprocessed {
                visualization: rgb.clone(),
                mask: Mask::new(rgb.width(), rgb.height()),
            })
        }
    }

    fn shaded_frame(shade: u8) -> RgbImage {
        RgbImage::from_fn(8, 6, |x, y| {
            if x == 2 && y == 3 {
                YELLOW
            } else {
                Rgb([0, 0, shade])
            }
        })
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify(Path::new("a/b.JPG")).unwrap(), MediaKind::Image);
        assert_eq!(classify(Path::new("clip.mp4")).unwrap(), MediaKind::Video);
        assert_eq!(classify(Path::new("clip.MKV")).unwrap(), MediaKind::Video);
        assert!(classify(Path::new("notes.txt")).is_err());
        assert!(classify(Path::new("no_extension")).is_err());
    }

    #[test]
    fn output_names_carry_stem_and_timestamp() {
        let paths = output_paths(
            Path::new("results/images"),
            Path::new("results/masks"),
            Path::new("data/example5.jpg"),
            "20240101_120000",
            "jpg",
        );
        assert_eq!(
            paths.annotated,
            PathBuf::from("results/images/detected_lane_example5_20240101_120000.jpg")
        );
        assert_eq!(
            paths.mask,
            PathBuf::from("results/masks/lane_mask_example5_20240101_120000.jpg")
        );
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = run_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
    }

    #[test]
    fn ensure_directory_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_directory(&nested).unwrap();
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn ensure_directory_reports_resource_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = ensure_directory(&file.join("sub")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Resource);
    }

    #[test]
    fn three_frame_video_keeps_order_and_size() {
        let detector = LaneDetector::default();
        let frames = vec![shaded_frame(10), shaded_frame(20), shaded_frame(30)];
        let mut source = MemorySource::new(frames);
        let mut annotated = MemorySink::default();
        let mut masks = MemorySink::default();

        let report = process_video(&detector, &mut source, &mut annotated, &mut masks).unwrap();

        assert_eq!(report, VideoReport { frames: 3, degraded_frames: 0, truncated: false });
        assert_eq!(annotated.frames.len(), 3);
        assert_eq!(masks.frames.len(), 3);
        assert!(annotated.finished && masks.finished);

        for (i, frame) in annotated.frames.iter().enumerate() {
            assert_eq!(frame.dimensions(), (8, 6));
            // 1.8x the source blue channel identifies the original frame
            let expected = ((10 * (i as u32 + 1)) as f32 * 1.8).round() as u8;
            assert_eq!(frame.get_pixel(0, 0)[2], expected);
        }
        for mask in &masks.frames {
            assert_eq!(mask.dimensions(), (8, 6));
            assert_eq!(*mask.get_pixel(2, 3), Rgb([255, 255, 255]));
            assert_eq!(*mask.get_pixel(0, 0), Rgb([0, 0, 0]));
        }
    }

    #[test]
    fn degraded_frame_is_written_as_fallback() {
        let detector =
            LaneDetector::with_preprocessor(Box::new(PickyPreprocessor), BlendParams::default());
        let red = RgbImage::from_pixel(8, 6, Rgb([255, 0, 0]));
        let mut source = MemorySource::new(vec![shaded_frame(10), red.clone(), shaded_frame(30)]);
        let mut annotated = MemorySink::default();
        let mut masks = MemorySink::default();

        let report = process_video(&detector, &mut source, &mut annotated, &mut masks).unwrap();

        assert_eq!(report.frames, 3);
        assert_eq!(report.degraded_frames, 1);
        assert_eq!(annotated.frames[1], red);
        assert!(masks.frames[1].pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn read_error_truncates_but_keeps_decoded_frames() {
        let detector = LaneDetector::default();
        let mut source = MemorySource::new(vec![shaded_frame(10), shaded_frame(20)]);
        source
            .frames
            .insert(1, Err(LaneError::Video("corrupt packet".into())));
        let mut annotated = MemorySink::default();
        let mut masks = MemorySink::default();

        let report = process_video(&detector, &mut source, &mut annotated, &mut masks).unwrap();

        assert!(report.truncated);
        assert_eq!(report.frames, 1);
        assert_eq!(annotated.frames.len(), 1);
        assert!(annotated.finished && masks.finished);
    }

    #[test]
    fn write_error_stops_video_and_finishes_sinks() {
        let detector = LaneDetector::default();
        let mut source = MemorySource::new(vec![shaded_frame(10), shaded_frame(20), shaded_frame(30)]);
        let mut annotated = MemorySink {
            fail_after: Some(1),
            ..Default::default()
        };
        let mut masks = MemorySink::default();

        let err = process_video(&detector, &mut source, &mut annotated, &mut masks).unwrap_err();

        assert!(err.to_string().contains("disk full"));
        assert_eq!(annotated.frames.len(), 1);
        assert_eq!(masks.frames.len(), 1);
        assert!(annotated.finished && masks.finished);
    }

    #[test]
    fn odd_sized_frames_are_resized_to_stream_resolution() {
        let detector = LaneDetector::default();
        let mut source = MemorySource::new(vec![shaded_frame(10), RgbImage::new(4, 4)]);
        let mut annotated = MemorySink::default();
        let mut masks = MemorySink::default();

        process_video(&detector, &mut source, &mut annotated, &mut masks).unwrap();

        assert!(annotated.frames.iter().all(|f| f.dimensions() == (8, 6)));
        assert!(masks.frames.iter().all(|f| f.dimensions() == (8, 6)));
    }

    #[test]
    fn image_pipeline_writes_annotated_and_mask() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("road.png");
        let frame = RgbImage::from_fn(100, 100, |x, y| {
            if (40..50).contains(&x) && (40..50).contains(&y) {
                YELLOW
            } else {
                Rgb([0, 0, 0])
            }
        });
        frame.save(&input).unwrap();

        let settings = OutputSettings {
            image_dir: tmp.path().join("out/images"),
            video_dir: tmp.path().join("out/videos"),
            mask_dir: tmp.path().join("out/masks"),
            image_ext: "png".to_string(),
            fourcc: Fourcc::MP4V,
        };

        let report =
            process_image(&LaneDetector::default(), &input, &settings, "20240101_000000").unwrap();

        assert!(!report.degraded);
        let mask = image::open(&report.outputs.mask).unwrap().to_luma8();
        assert_eq!(mask.dimensions(), (100, 100));
        let lit = mask.pixels().filter(|p| **p == Luma([255])).count();
        assert_eq!(lit, 100);

        let annotated = image::open(&report.outputs.annotated).unwrap().to_rgb8();
        assert_eq!(*annotated.get_pixel(44, 44), Rgb([160, 255, 34]));
    }

    #[test]
    fn failed_mask_sink_removes_annotated_output() {
        let tmp = tempfile::tempdir().unwrap();
        let outputs = output_paths(tmp.path(), tmp.path(), Path::new("clip.mp4"), "ts", "mp4");

        let result = open_sink_pair(&outputs, |path| {
            if path == outputs.mask.as_path() {
                return Err(LaneError::Video("encoder missing".into()));
            }
            std::fs::write(path, b"").unwrap();
            Ok(FileSink {
                path: path.to_path_buf(),
            })
        });

        let err = result.err().unwrap();
        assert!(err.to_string().contains("encoder missing"));
        assert!(!outputs.annotated.exists());
        assert!(!outputs.mask.exists());
    }

    #[test]
    fn sink_pair_opens_both_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let outputs = output_paths(tmp.path(), tmp.path(), Path::new("clip.mp4"), "ts", "mp4");

        let (annotated, mask) = open_sink_pair(&outputs, |path| {
            std::fs::write(path, b"").unwrap();
            Ok(FileSink {
                path: path.to_path_buf(),
            })
        })
        .unwrap();

        assert_eq!(annotated.path, outputs.annotated);
        assert_eq!(mask.path, outputs.mask);
        assert!(outputs.annotated.exists() && outputs.mask.exists());
    }

    #[test]
    fn rgba_still_is_detected_like_rgb() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("road_alpha.png");
        RgbaImage::from_fn(100, 100, |x, y| {
            if (40..50).contains(&x) && (40..50).contains(&y) {
                Rgba([200, 148, 43, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
        .save(&input)
        .unwrap();

        let settings = OutputSettings {
            image_dir: tmp.path().join("images"),
            mask_dir: tmp.path().join("masks"),
            image_ext: "png".to_string(),
            ..Default::default()
        };

        let report =
            process_image(&LaneDetector::default(), &input, &settings, "20240101_000000").unwrap();

        assert!(!report.degraded);
        let mask = image::open(&report.outputs.mask).unwrap().to_luma8();
        let lit: Vec<(u32, u32)> = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == Luma([255]))
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(lit.len(), 100);
        assert!(lit.iter().all(|&(x, y)| (40..50).contains(&x) && (40..50).contains(&y)));
    }

    #[test]
    fn gray_still_is_expanded_and_blended() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("gray.png");
        GrayImage::from_pixel(10, 10, Luma([128])).save(&input).unwrap();

        let loaded = load_color_image(&input).unwrap();
        assert_eq!(loaded.color(), image::ColorType::Rgb8);

        let settings = OutputSettings {
            image_dir: tmp.path().join("images"),
            mask_dir: tmp.path().join("masks"),
            image_ext: "png".to_string(),
            ..Default::default()
        };
        let report =
            process_image(&LaneDetector::default(), &input, &settings, "20240101_000000").unwrap();

        assert!(!report.degraded);
        let annotated = image::open(&report.outputs.annotated).unwrap().to_rgb8();
        // 128 * 1.8
        assert_eq!(*annotated.get_pixel(3, 3), Rgb([230, 230, 230]));
    }

    #[test]
    fn unreadable_image_is_invalid_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("missing.jpg");
        let settings = OutputSettings {
            image_dir: tmp.path().join("images"),
            mask_dir: tmp.path().join("masks"),
            ..Default::default()
        };

        let err = process_image(&LaneDetector::default(), &input, &settings, "ts").unwrap_err();
        assert!(matches!(err, LaneError::InvalidInput(_)));
        assert!(!settings.image_dir.exists());
    }

    #[test]
    fn batch_continues_past_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.png");
        RgbImage::from_pixel(5, 5, YELLOW).save(&good).unwrap();

        let settings = OutputSettings {
            image_dir: tmp.path().join("images"),
            video_dir: tmp.path().join("videos"),
            mask_dir: tmp.path().join("masks"),
            image_ext: "png".to_string(),
            fourcc: Fourcc::MP4V,
        };
        let inputs = vec![
            tmp.path().join("missing.png"),
            tmp.path().join("readme.txt"),
            good,
        ];

        let summary = run_batch(&LaneDetector::default(), &inputs, &settings);

        assert_eq!(summary.images_ok, 1);
        assert_eq!(summary.images_failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(std::fs::read_dir(&settings.mask_dir).unwrap().count(), 1);
    }
}
