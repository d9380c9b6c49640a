//! Core library for supervising a single ffmpeg encode and describing media files.
//!
//! The crate probes media with ffprobe into a read-only [`MediaDescription`],
//! runs ffmpeg through a [`ProcessContext`] that streams progress and
//! diagnostics to subscribers, and drives both from the [`Encoder`] state
//! machine, which reports progress, ETA and a single final outcome.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use vidcoder_core::{EncodingConfig, Encoder, ToolPaths};
//! use std::path::Path;
//!
//! let tools = ToolPaths::from_env();
//! let config = EncodingConfig::default();
//! let input = Path::new("/videos/holiday.mov");
//! let output = config.suggest_output_path(Some(input));
//!
//! let encoder = Encoder::new(input, output, config.default_encoding_params(), &tools)
//!     .on_progress(|p| println!("{:.1}% (ETA {}s)", p.percent, p.eta_secs))
//!     .on_finished(|outcome| println!("{}", outcome.message));
//!
//! let outcome = encoder.start();
//! assert!(outcome.success);
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod external;
pub mod media;
pub mod process;
pub mod utils;

// Re-exports for public API
pub use config::{EncodingConfig, ToolPaths};
pub use encoder::{
    EffectiveOptions, Encoder, EncodingOutcome, EncodingSettings, EncodingState, ProgressUpdate,
};
pub use error::{CoreError, CoreResult};
pub use external::{CommandFfprobeExecutor, FfprobeExecutor, probe};
pub use media::{
    AudioStream, FormatInfo, MediaDescription, ProbeReport, Ratio, StreamKind, StreamRecord,
    VideoStream,
};
pub use process::{ExecutionOutcome, OptionMap, ProcessContext, ProgressTick};
pub use utils::{format_bytes, format_duration, format_si, parse_ffmpeg_time};
