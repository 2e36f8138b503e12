//! Video sources.
//!
//! The extraction loop reads frames through the [`VideoSource`] trait:
//! seek to a timestamp, then borrow the frame shown at that point.
//! [`MediaFile`] implements it on top of FFmpeg; [`FrameSequence`] holds
//! pre-decoded frames in memory.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{
    error::BurnsubError,
    metadata::VideoMetadata,
    utilities::{duration_to_seek_timestamp, frame_to_rgb_buffer, pts_to_duration},
};

/// How far ahead of the last decoded frame a seek target may be before the
/// decoder is repositioned instead of decoding forward.
const FORWARD_DECODE_WINDOW: Duration = Duration::from_secs(3);

/// A seekable sequence of frames.
pub trait VideoSource {
    /// Total duration of the video.
    fn duration(&self) -> Duration;

    /// Frame `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Position the source on the frame shown at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame can be produced for `timestamp`.
    fn seek(&mut self, timestamp: Duration) -> Result<(), BurnsubError>;

    /// The frame selected by the last successful [`seek`](VideoSource::seek).
    ///
    /// # Errors
    ///
    /// Returns [`BurnsubError::VideoDecodeError`] if nothing has been
    /// decoded yet.
    fn current_frame(&self) -> Result<&DynamicImage, BurnsubError>;
}

/// An opened video file decoded with FFmpeg.
///
/// The demuxer, decoder and RGB scaler live as long as the file, so a run
/// of increasing seek targets decodes forward through the stream instead of
/// restarting from a keyframe for every sample.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use burnsub::{BurnsubError, MediaFile, VideoSource};
///
/// let mut video = MediaFile::open("input.mp4")?;
/// video.seek(Duration::from_secs(12))?;
/// video.current_frame()?.save("frame.png")?;
/// # Ok::<(), BurnsubError>(())
/// ```
pub struct MediaFile {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    metadata: VideoMetadata,
    file_path: PathBuf,
    /// Timestamp and RGB image of the frame the source is positioned on.
    current: Option<(Duration, DynamicImage)>,
    /// Target of the last successful seek.
    last_target: Option<Duration>,
    /// End of file reached and the decoder flushed.
    draining: bool,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .field("current_timestamp", &self.current.as_ref().map(|(ts, _)| *ts))
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, locates the best
    /// video stream, and caches its metadata.
    ///
    /// # Errors
    ///
    /// - [`BurnsubError::FileOpen`] if the file cannot be opened or its
    ///   decoder cannot be created.
    /// - [`BurnsubError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BurnsubError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| BurnsubError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| BurnsubError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(BurnsubError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                BurnsubError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to read video codec parameters: {error}"),
                }
            })?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| BurnsubError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let container_microseconds = input_context.duration();
        let duration = if container_microseconds > 0 {
            Duration::from_micros(container_microseconds as u64)
        } else {
            pts_to_duration(stream.duration(), time_base)
        };

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            f64::from(frame_rate.numerator()) / f64::from(frame_rate.denominator())
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                f64::from(rate.numerator()) / f64::from(rate.denominator())
            } else {
                0.0
            }
        };
        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            codec,
            duration,
            format: input_context.format().name().to_string(),
        };

        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            metadata.width,
            metadata.height,
            ScalingFlags::BILINEAR,
        )?;

        log::debug!(
            "Opened {}: {}x{} {} at {:.3} fps, {:?}",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.codec,
            metadata.frames_per_second,
            metadata.duration,
        );

        Ok(Self {
            input_context,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            metadata,
            file_path,
            current: None,
            last_target: None,
            draining: false,
        })
    }

    /// Cached metadata of the video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Reposition the demuxer on the keyframe at or before `timestamp`.
    fn reposition(&mut self, timestamp: Duration) -> Result<(), BurnsubError> {
        let target = duration_to_seek_timestamp(timestamp);
        log::debug!("Seeking {} to {timestamp:?}", self.file_path.display());

        self.input_context
            .seek(target, ..target)
            .map_err(|error| BurnsubError::SeekFailed {
                timestamp,
                reason: error.to_string(),
            })?;
        self.decoder.flush();
        self.draining = false;
        self.current = None;
        Ok(())
    }

    /// Pull the next decoded frame, feeding packets as needed.
    ///
    /// Returns `None` once the stream is exhausted.
    fn next_decoded_frame(&mut self) -> Result<Option<VideoFrame>, BurnsubError> {
        loop {
            let mut decoded_frame = VideoFrame::empty();
            if self.decoder.receive_frame(&mut decoded_frame).is_ok() {
                return Ok(Some(decoded_frame));
            }
            if self.draining {
                return Ok(None);
            }

            match self.input_context.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.video_stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                None => {
                    self.decoder.send_eof()?;
                    self.draining = true;
                }
            }
        }
    }

    /// Decode forward until a frame at or after `timestamp` is reached.
    ///
    /// Past the end of the stream the last decoded frame is kept.
    fn decode_until(&mut self, timestamp: Duration) -> Result<(), BurnsubError> {
        let mut latest: Option<(Duration, VideoFrame)> = None;

        while let Some(decoded_frame) = self.next_decoded_frame()? {
            let pts = decoded_frame.timestamp().or(decoded_frame.pts()).unwrap_or(0);
            let frame_time = pts_to_duration(pts, self.time_base);
            let reached = frame_time >= timestamp;
            latest = Some((frame_time, decoded_frame));
            if reached {
                break;
            }
        }

        match latest {
            Some((frame_time, decoded_frame)) => {
                let image = self.convert(&decoded_frame)?;
                self.current = Some((frame_time, image));
                Ok(())
            }
            None if self.current.is_some() => Ok(()),
            None => Err(BurnsubError::SeekFailed {
                timestamp,
                reason: "no frame could be decoded at or before this position".to_string(),
            }),
        }
    }

    fn convert(&mut self, decoded_frame: &VideoFrame) -> Result<DynamicImage, BurnsubError> {
        let mut rgb_frame = VideoFrame::empty();
        self.scaler.run(decoded_frame, &mut rgb_frame)?;
        convert_frame_to_image(&rgb_frame, self.metadata.width, self.metadata.height)
    }
}

impl VideoSource for MediaFile {
    fn duration(&self) -> Duration {
        self.metadata.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.metadata.width, self.metadata.height)
    }

    fn seek(&mut self, timestamp: Duration) -> Result<(), BurnsubError> {
        let moving_forward = self.last_target.is_some_and(|last| timestamp >= last);
        let current_time = self.current.as_ref().map(|(frame_time, _)| *frame_time);

        match current_time {
            // The frame already on screen is still the first one at or
            // after the target.
            Some(frame_time) if moving_forward && frame_time >= timestamp => {}
            Some(frame_time)
                if moving_forward && timestamp - frame_time <= FORWARD_DECODE_WINDOW =>
            {
                self.decode_until(timestamp)?;
            }
            _ => {
                self.reposition(timestamp)?;
                self.decode_until(timestamp)?;
            }
        }

        self.last_target = Some(timestamp);
        Ok(())
    }

    fn current_frame(&self) -> Result<&DynamicImage, BurnsubError> {
        self.current
            .as_ref()
            .map(|(_, image)| image)
            .ok_or_else(|| BurnsubError::VideoDecodeError("no frame has been decoded".to_string()))
    }
}

/// Convert a scaled RGB24 video frame to an [`image::DynamicImage`].
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, BurnsubError> {
    let buffer = frame_to_rgb_buffer(rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        BurnsubError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}

/// Pre-decoded frames held in memory.
///
/// Seeking selects the last frame whose timestamp is at or before the
/// target, or the first frame when the target precedes them all. Useful
/// for image sequences and for driving an extraction without FFmpeg.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use burnsub::{FrameSequence, VideoSource};
/// use image::{DynamicImage, RgbImage};
///
/// let frame = DynamicImage::ImageRgb8(RgbImage::new(64, 36));
/// let mut video = FrameSequence::new(Duration::from_secs(2))
///     .with_frame(Duration::ZERO, frame.clone())
///     .with_frame(Duration::from_secs(1), frame);
///
/// video.seek(Duration::from_millis(1_500)).unwrap();
/// assert_eq!(video.dimensions(), (64, 36));
/// ```
#[derive(Debug, Clone)]
pub struct FrameSequence {
    duration: Duration,
    frames: Vec<(Duration, DynamicImage)>,
    position: Option<usize>,
}

impl FrameSequence {
    /// An empty sequence lasting `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            frames: Vec::new(),
            position: None,
        }
    }

    /// Add a frame shown from `timestamp` onwards.
    ///
    /// Frames are kept ordered by timestamp; a frame at an existing
    /// timestamp replaces it.
    #[must_use]
    pub fn with_frame(mut self, timestamp: Duration, image: DynamicImage) -> Self {
        self.push(timestamp, image);
        self
    }

    /// Add a frame shown from `timestamp` onwards.
    pub fn push(&mut self, timestamp: Duration, image: DynamicImage) {
        match self.frames.binary_search_by_key(&timestamp, |(ts, _)| *ts) {
            Ok(index) => self.frames[index].1 = image,
            Err(index) => self.frames.insert(index, (timestamp, image)),
        }
        self.position = None;
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl VideoSource for FrameSequence {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|(_, image)| (image.width(), image.height()))
            .unwrap_or((0, 0))
    }

    fn seek(&mut self, timestamp: Duration) -> Result<(), BurnsubError> {
        if self.frames.is_empty() {
            return Err(BurnsubError::SeekFailed {
                timestamp,
                reason: "frame sequence is empty".to_string(),
            });
        }
        let following = self.frames.partition_point(|(ts, _)| *ts <= timestamp);
        self.position = Some(following.saturating_sub(1));
        Ok(())
    }

    fn current_frame(&self) -> Result<&DynamicImage, BurnsubError> {
        self.position
            .and_then(|index| self.frames.get(index))
            .map(|(_, image)| image)
            .ok_or_else(|| BurnsubError::VideoDecodeError("no frame has been selected".to_string()))
    }
}
