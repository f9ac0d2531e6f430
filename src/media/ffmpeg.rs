use super::{Fourcc, VideoSink, VideoSource};
use crate::error::{LaneError, Result};
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use image::RgbImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ChildStdin;

const FALLBACK_FPS: f64 = 30.0;

/// Decodes a video container to rgb24 frames through an ffmpeg child process
pub struct FfmpegVideoReader {
    path: PathBuf,
    child: FfmpegChild,
    events: FfmpegIterator,
    width: u32,
    height: u32,
    fps: f64,
    frames_read: u64,
    /// First decoded frame, held back while the output size is settled
    pending: Option<RgbImage>,
    last_error: Option<String>,
    exhausted: bool,
}

impl FfmpegVideoReader {
    /// Open a video and read its first video stream's properties
    ///
    /// # Errors
    /// * `LaneError::InvalidInput` if ffmpeg finds no video stream
    /// * `LaneError::Video` if ffmpeg cannot be started
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Opening video: {}", path.display());

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(&*path.to_string_lossy())
            .args(["-map", "0:v:0"])
            .rawvideo()
            .spawn()
            .map_err(|e| LaneError::Video(format!("failed to start ffmpeg: {e}")))?;

        let mut events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                let _ = child.kill();
                return Err(LaneError::Video(format!(
                    "failed to read ffmpeg output: {e}"
                )));
            }
        };

        let mut last_error = None;
        let (width, height, fps) = loop {
            match events.next() {
                Some(FfmpegEvent::ParsedInputStream(stream)) => {
                    if let Some(video) = stream.video_data() {
                        break (video.width, video.height, video.fps as f64);
                    }
                }
                Some(FfmpegEvent::Error(message))
                | Some(FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message)) => {
                    last_error = Some(message);
                }
                Some(_) => {}
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(LaneError::InvalidInput(format!(
                        "failed to open video file {}: {}",
                        path.display(),
                        last_error.unwrap_or_else(|| "no video stream".to_string())
                    )));
                }
            }
        };

        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            tracing::warn!(
                "{} does not declare a frame rate, assuming {}",
                path.display(),
                FALLBACK_FPS
            );
            FALLBACK_FPS
        };

        let mut reader = Self {
            path: path.to_path_buf(),
            child,
            events,
            width,
            height,
            fps,
            frames_read: 0,
            pending: None,
            last_error: None,
            exhausted: false,
        };

        // Rotation metadata is applied by the decoder, so the stream header
        // can disagree with the frames actually produced.
        reader.pending = reader.decode_next()?;
        let (width, height) =
            decoded_resolution((width, height), reader.pending.as_ref().map(|f| f.dimensions()));
        if (width, height) != (reader.width, reader.height) {
            tracing::info!(
                "Stream declares {}x{} but decodes to {}x{}",
                reader.width,
                reader.height,
                width,
                height
            );
        }
        reader.width = width;
        reader.height = height;

        tracing::info!("Video properties: {}x{} @ {:.1} FPS", width, height, fps);

        Ok(reader)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn finish_decoder(&mut self) -> Result<()> {
        self.exhausted = true;
        let status = self
            .child
            .wait()
            .map_err(|e| LaneError::resource(&self.path, e))?;

        if !status.success() {
            return Err(LaneError::Video(format!(
                "ffmpeg exited with {} while decoding {}: {}",
                status,
                self.path.display(),
                self.last_error.as_deref().unwrap_or("no error output")
            )));
        }
        Ok(())
    }

    /// Pull the next raw frame out of the event stream
    fn decode_next(&mut self) -> Result<Option<RgbImage>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            match self.events.next() {
                Some(FfmpegEvent::OutputFrame(frame)) => {
                    let (width, height) = (frame.width, frame.height);
                    let image = RgbImage::from_raw(width, height, frame.data).ok_or_else(|| {
                        LaneError::Video(format!(
                            "frame {} is shorter than {}x{} rgb24",
                            self.frames_read, width, height
                        ))
                    })?;
                    return Ok(Some(image));
                }
                Some(FfmpegEvent::Error(message))
                | Some(FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message)) => {
                    tracing::debug!("ffmpeg: {}", message);
                    self.last_error = Some(message);
                }
                Some(_) => {}
                None => {
                    self.finish_decoder()?;
                    return Ok(None);
                }
            }
        }
    }
}

/// Size of the frames a reader yields: the first decoded frame wins over the
/// stream header, which is only used for empty streams
fn decoded_resolution(declared: (u32, u32), first_frame: Option<(u32, u32)>) -> (u32, u32) {
    first_frame.unwrap_or(declared)
}

impl VideoSource for FfmpegVideoReader {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let frame = match self.pending.take() {
            Some(frame) => Some(frame),
            None => self.decode_next()?,
        };
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}

impl Drop for FfmpegVideoReader {
    fn drop(&mut self) {
        if !self.exhausted {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Encodes rgb24 frames into a video container through an ffmpeg child process
pub struct FfmpegVideoWriter {
    path: PathBuf,
    child: Option<FfmpegChild>,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl FfmpegVideoWriter {
    /// Start an encoder writing to `path`
    ///
    /// # Arguments
    /// * `fourcc` - Codec tag selecting the encoder
    /// * `fps` - Output frame rate
    /// * `size` - Frame (width, height); every written frame must match
    pub fn create<P: AsRef<Path>>(
        path: P,
        fourcc: Fourcc,
        fps: f64,
        size: (u32, u32),
    ) -> Result<Self> {
        let path = path.as_ref();
        let (width, height) = size;

        tracing::info!(
            "Opening video writer {} ({}x{} @ {:.1} FPS, {})",
            path.display(),
            width,
            height,
            fps,
            fourcc
        );

        let mut args: Vec<String> = vec![
            "-c:v".into(),
            fourcc.encoder().into(),
        ];
        if fourcc.is_container_tag() {
            args.extend(["-tag:v".into(), fourcc.to_string()]);
        }
        if matches!(fourcc.encoder(), "mpeg4" | "libx264" | "libx265") {
            args.extend(["-pix_fmt".into(), "yuv420p".into()]);
        }

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .args(["-loglevel", "error", "-nostats"])
            .args([
                "-f".to_string(),
                "rawvideo".to_string(),
                "-pix_fmt".to_string(),
                "rgb24".to_string(),
                "-s".to_string(),
                format!("{width}x{height}"),
                "-r".to_string(),
                format!("{fps}"),
            ])
            .input("-")
            .args(args)
            .overwrite()
            .output(&*path.to_string_lossy())
            .spawn()
            .map_err(|e| LaneError::Video(format!("failed to start ffmpeg: {e}")))?;

        let stdin = child.take_stdin();
        if stdin.is_none() {
            let _ = child.kill();
            return Err(LaneError::Video("ffmpeg stdin is not available".into()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            child: Some(child),
            stdin,
            width,
            height,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl VideoSink for FfmpegVideoWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(LaneError::Video(format!(
                "frame is {:?} but {} expects {}x{}",
                frame.dimensions(),
                self.path.display(),
                self.width,
                self.height
            )));
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| {
            LaneError::Video(format!("{} is already finished", self.path.display()))
        })?;

        stdin
            .write_all(frame.as_raw())
            .map_err(|e| LaneError::resource(&self.path, e))?;
        self.frames_written += 1;
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed partial output {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LaneError::resource(&self.path, e)),
        }
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals end of stream to the encoder
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child
            .wait()
            .map_err(|e| LaneError::resource(&self.path, e))?;
        if !status.success() {
            return Err(LaneError::Video(format!(
                "ffmpeg exited with {} while writing {}",
                status,
                self.path.display()
            )));
        }

        tracing::debug!(
            "Finalized {} ({} frames)",
            self.path.display(),
            self.frames_written
        );
        Ok(())
    }
}

impl Drop for FfmpegVideoWriter {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.finish() {
                tracing::warn!("Failed to finalize {}: {}", self.path.display(), e);
            }
        }
    }
}
