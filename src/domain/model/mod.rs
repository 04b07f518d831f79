// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        // Try parsing as seconds (float)
        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(DomainError::InvalidInput("Time must be a finite number".to_string()));
            }
            if seconds < 0.0 {
                return Err(DomainError::InvalidInput("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        // Try parsing as HH:MM:SS.ms or MM:SS.ms
        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0, Self::parse_unit(m, "minutes")?, Self::parse_seconds(s)?),
            [h, m, s] => {
                let minutes = Self::parse_unit(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::InvalidInput("Minutes must be less than 60".to_string()));
                }
                (Self::parse_unit(h, "hours")?, minutes, Self::parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::InvalidInput(
                    "Invalid time format. Supported formats: seconds (e.g., 12.5), MM:SS.ms (e.g., 0:12.5), HH:MM:SS.ms (e.g., 0:00:12.5)".to_string(),
                ))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds_part,
        ))
    }

    fn parse_unit(value: &str, name: &str) -> Result<u32, DomainError> {
        value
            .parse::<u32>()
            .map_err(|_| DomainError::InvalidInput(format!("Invalid {} format", name)))
    }

    fn parse_seconds(value: &str) -> Result<f64, DomainError> {
        let seconds = value
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidInput("Invalid seconds format".to_string()))?;
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::InvalidInput("Seconds must be less than 60".to_string()));
        }
        Ok(seconds)
    }

    /// Format as the short `12.3s` label shown next to the time slider
    pub fn format_short(&self) -> String {
        format!("{:.1}s", self.seconds)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = (self.seconds / 3600.0) as u32;
        let minutes = ((self.seconds % 3600.0) / 60.0) as u32;
        let seconds = self.seconds % 60.0;
        if hours > 0 {
            write!(f, "{:02}:{:02}:{:06.3}", hours, minutes, seconds)
        } else {
            write!(f, "{:02}:{:06.3}", minutes, seconds)
        }
    }
}

/// A point in display space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Dimensions of a display-space container, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new container size; both dimensions must be positive and finite
    pub fn new(width: f64, height: f64) -> Result<Self, DomainError> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Container dimensions must be positive: {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Length of the shorter side
    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

impl FromStr for Size {
    type Err = DomainError;

    /// Parse `WIDTHxHEIGHT`, e.g. `800x450`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| DomainError::InvalidInput(format!("Expected WIDTHxHEIGHT, got '{}'", s)))?;
        let width = w
            .trim()
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidInput(format!("Invalid width: '{}'", w)))?;
        let height = h
            .trim()
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidInput(format!("Invalid height: '{}'", h)))?;
        Size::new(width, height)
    }
}

/// Native pixel dimensions of decoded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
}

impl MediaDimensions {
    /// Create new media dimensions with validation
    pub fn new(width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidInput("Video dimensions cannot be zero".to_string()));
        }
        Ok(Self { width, height })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// The native frame viewed as a container, so display space equals source space
    pub fn as_size(&self) -> Size {
        Size {
            width: self.width as f64,
            height: self.height as f64,
        }
    }
}

impl FromStr for MediaDimensions {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size: Size = s.parse()?;
        if size.width.fract() != 0.0 || size.height.fract() != 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Media dimensions must be whole pixels: '{}'",
                s
            )));
        }
        MediaDimensions::new(size.width as u32, size.height as u32)
    }
}

/// Sub-region of a container actually covered by the rendered media
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.offset_x
            && point.y >= self.offset_y
            && point.x <= self.offset_x + self.width
            && point.y <= self.offset_y + self.height
    }
}

/// Corner handles of the crop region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    /// The diagonally opposite corner
    pub fn opposite(self) -> Corner {
        match self {
            Corner::Nw => Corner::Se,
            Corner::Ne => Corner::Sw,
            Corner::Sw => Corner::Ne,
            Corner::Se => Corner::Nw,
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Corner::Nw => "nw",
            Corner::Ne => "ne",
            Corner::Sw => "sw",
            Corner::Se => "se",
        };
        f.write_str(name)
    }
}

impl FromStr for Corner {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nw" => Ok(Corner::Nw),
            "ne" => Ok(Corner::Ne),
            "sw" => Ok(Corner::Sw),
            "se" => Ok(Corner::Se),
            _ => Err(DomainError::InvalidInput(format!(
                "Invalid corner: {}. Valid corners: nw, ne, sw, se",
                s
            ))),
        }
    }
}

/// Square crop rectangle in display-space pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl CropRegion {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self { x, y, size }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.size
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.size
    }

    /// Position of the given corner
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::Nw => Point::new(self.x, self.y),
            Corner::Ne => Point::new(self.right(), self.y),
            Corner::Sw => Point::new(self.x, self.bottom()),
            Corner::Se => Point::new(self.right(), self.bottom()),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Check every region invariant against a container
    pub fn satisfies(&self, container: Size, min_size: f64) -> bool {
        let finite = self.x.is_finite() && self.y.is_finite() && self.size.is_finite();
        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= container.width
            && self.bottom() <= container.height
            && self.size >= min_size
            && self.size <= container.min_side()
    }

    /// Validate against a container, returning the violated invariant
    pub fn validate(&self, container: Size, min_size: f64) -> Result<(), DomainError> {
        if self.satisfies(container, min_size) {
            return Ok(());
        }
        Err(DomainError::InvalidInput(format!(
            "Crop region {{x: {}, y: {}, size: {}}} does not fit a {}x{} container with minimum size {}",
            self.x, self.y, self.size, container.width, container.height, min_size
        )))
    }
}

impl FromStr for CropRegion {
    type Err = DomainError;

    /// Parse `X,Y,SIZE`, e.g. `300,168.75,180`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_triple(s)?;
        Ok(CropRegion::new(values[0], values[1], values[2]))
    }
}

/// Square crop in native media pixels; the only crop form handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCropParams {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl SourceCropParams {
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self { x, y, size }
    }

    /// Shrink and shift the crop so it lies inside the native frame
    pub fn fit_within(&self, media: MediaDimensions) -> Self {
        let size = self.size.min(media.width).min(media.height);
        Self {
            x: self.x.min(media.width - size),
            y: self.y.min(media.height - size),
            size,
        }
    }

    pub fn is_within(&self, media: MediaDimensions) -> bool {
        self.x as u64 + self.size as u64 <= media.width as u64
            && self.y as u64 + self.size as u64 <= media.height as u64
    }
}

impl FromStr for SourceCropParams {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_triple(s)?;
        if values.iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
            return Err(DomainError::InvalidInput(format!(
                "Source crop must be non-negative whole pixels: '{}'",
                s
            )));
        }
        Ok(SourceCropParams::new(values[0] as u32, values[1] as u32, values[2] as u32))
    }
}

fn parse_triple(s: &str) -> Result<[f64; 3], DomainError> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(DomainError::InvalidInput(format!("Expected X,Y,SIZE, got '{}'", s)));
    }
    let mut values = [0.0; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidInput(format!("Invalid number '{}' in '{}'", part, s)))?;
    }
    Ok(values)
}

/// Output policy for one generated GIF
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPolicy {
    /// Clip length in seconds
    pub duration_secs: f64,
    /// Output frame rate
    pub fps: u32,
    /// Edge length of the square output, in pixels
    pub output_size: u32,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            duration_secs: 4.0,
            fps: 10,
            output_size: 62,
        }
    }
}

impl GenerationPolicy {
    /// Frames the engine is expected to encode (40 for the default policy)
    pub fn expected_frame_count(&self) -> u32 {
        (self.fps as f64 * self.duration_secs).round().max(1.0) as u32
    }
}

/// A confirmed selection ready to be turned into a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub source: PathBuf,
    pub start_time: f64,
    pub crop: SourceCropParams,
    pub duration: f64,
    pub fps: u32,
    pub output_size: u32,
}

impl GenerateRequest {
    pub fn new(source: PathBuf, start_time: f64, crop: SourceCropParams, policy: GenerationPolicy) -> Self {
        Self {
            source,
            start_time,
            crop,
            duration: policy.duration_secs,
            fps: policy.fps,
            output_size: policy.output_size,
        }
    }

    pub fn policy(&self) -> GenerationPolicy {
        GenerationPolicy {
            duration_secs: self.duration,
            fps: self.fps,
            output_size: self.output_size,
        }
    }

    /// Reject requests that can never produce a valid image
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Start time must be a non-negative number of seconds, got {}",
                self.start_time
            )));
        }
        if self.crop.size == 0 {
            return Err(DomainError::InvalidInput("Crop size must be at least one pixel".to_string()));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(DomainError::InvalidInput("Duration must be positive".to_string()));
        }
        if self.fps == 0 {
            return Err(DomainError::InvalidInput("Frame rate must be positive".to_string()));
        }
        if self.output_size == 0 {
            return Err(DomainError::InvalidInput("Output size must be positive".to_string()));
        }
        if self.source.as_os_str().is_empty() {
            return Err(DomainError::InvalidInput("No source file selected".to_string()));
        }
        Ok(())
    }
}

/// Media metadata reported by the probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration: TimeSpec,
    pub frame_rate: f64,
    pub codec: String,
    pub format: String,
    pub file_size: u64,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn dimensions(&self) -> Result<MediaDimensions, DomainError> {
        MediaDimensions::new(self.width, self.height)
    }
}
