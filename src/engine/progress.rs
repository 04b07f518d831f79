//! Progress estimation and callback system for UI integration

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::model::GenerationPolicy;
use crate::ports::EngineSignal;

/// Overall percentage reached once setup and loading are done
pub const PROCESSING_START: f64 = 30.0;
/// Share of the overall percentage given to the transcode itself
pub const PROCESSING_SPAN: f64 = 60.0;
/// The frame-counter estimator never claims more than this share of the span
pub const FRAME_ESTIMATE_CAP: f64 = 0.95;

fn frame_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"frame=\s*(\d+)").expect("frame pattern is a valid regex"))
}

/// One progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Overall percentage (0.0 - 100.0); not guaranteed monotonic
    pub percent: f64,
    pub message: String,
}

/// Maps raw engine signals onto the overall percentage window `[30, 90]`
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    expected_frames: u32,
}

impl ProgressEstimator {
    pub fn new(policy: GenerationPolicy) -> Self {
        Self {
            expected_frames: policy.expected_frame_count(),
        }
    }

    pub fn expected_frames(&self) -> u32 {
        self.expected_frames
    }

    /// Continuous estimator: `30 + fraction * 60`
    pub fn from_fraction(&self, fraction: f64) -> ProgressUpdate {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        ProgressUpdate {
            percent: PROCESSING_START + fraction * PROCESSING_SPAN,
            message: format!("Processing... {}%", (fraction * 100.0).round()),
        }
    }

    /// Coarse fallback estimator: `30 + min(frame / expected, 0.95) * 60`
    pub fn from_frame(&self, frame: u64) -> ProgressUpdate {
        let ratio = (frame as f64 / self.expected_frames as f64).min(FRAME_ESTIMATE_CAP);
        ProgressUpdate {
            percent: PROCESSING_START + ratio * PROCESSING_SPAN,
            message: format!("Processing frame {}...", frame),
        }
    }

    /// Extract the frame counter from an engine log line
    pub fn parse_frame(line: &str) -> Option<u64> {
        frame_pattern()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Estimate from either signal; log lines without a frame counter yield nothing
    pub fn estimate(&self, signal: &EngineSignal) -> Option<ProgressUpdate> {
        match signal {
            EngineSignal::Fraction(fraction) => Some(self.from_fraction(*fraction)),
            EngineSignal::Log(line) => Self::parse_frame(line).map(|frame| self.from_frame(frame)),
        }
    }
}

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called when a job starts
    fn on_start(&self, operation: &str);

    /// Called for every progress report
    fn on_progress(&self, percent: f64, message: &str);

    /// Called once when the job produced its output
    fn on_complete(&self, bytes: usize);

    /// Called once when the job failed
    fn on_error(&self, error: &str);

    /// Called when the job was cancelled
    fn on_cancel(&self);
}

/// Console progress callback for CLI usage; draws on stderr so stdout stays clean
pub struct ConsoleProgressCallback {
    verbose: bool,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn bar(percent: f64) -> String {
        let bar_length = 20;
        let filled = ((percent.clamp(0.0, 100.0) / 100.0) * bar_length as f64) as usize;
        "#".repeat(filled) + &"-".repeat(bar_length - filled)
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, operation: &str) {
        if self.verbose {
            eprintln!("Starting: {}", operation);
        }
    }

    fn on_progress(&self, percent: f64, message: &str) {
        eprint!("\r[{}] {:>5.1}% {:<32}", Self::bar(percent), percent, message);
    }

    fn on_complete(&self, bytes: usize) {
        eprintln!();
        eprintln!("Completed: {} bytes", bytes);
    }

    fn on_error(&self, error: &str) {
        eprintln!();
        eprintln!("Error generating GIF: {}", error);
    }

    fn on_cancel(&self) {
        eprintln!();
        eprintln!("Generation cancelled");
    }
}

/// JSON progress callback for structured output
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str) {
        let event = serde_json::json!({
            "event": "start",
            "operation": operation,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_progress(&self, percent: f64, message: &str) {
        let event = serde_json::json!({
            "event": "progress",
            "percent": percent,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_complete(&self, bytes: usize) {
        let event = serde_json::json!({
            "event": "complete",
            "bytes": bytes,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_error(&self, error: &str) {
        let event = serde_json::json!({
            "event": "error",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_cancel(&self) {
        let event = serde_json::json!({
            "event": "cancel",
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }
}

/// No-op progress callback for when progress tracking is disabled
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_start(&self, _operation: &str) {}
    fn on_progress(&self, _percent: f64, _message: &str) {}
    fn on_complete(&self, _bytes: usize) {}
    fn on_error(&self, _error: &str) {}
    fn on_cancel(&self) {}
}
