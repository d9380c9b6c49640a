//! Implementation of the 'encode' subcommand.
//!
//! Resolves encoding settings from the optional config file and the flags,
//! checks that both external tools start, then runs a single encoder with a
//! live progress bar and prints a summary of the result. Ctrl-C cancels the
//! running encode; a second press exits immediately.

use crate::cli::EncodeArgs;
use crate::error::{CliError, CliResult};
use crate::progress::EncodeProgress;
use crate::terminal;

use vidcoder_core::external::check_dependency;
use vidcoder_core::{
    Encoder, EncodingConfig, EncodingOutcome, EncodingSettings, EncodingState, ToolPaths,
    format_bytes, format_duration,
};

use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, error, info, warn};

/// Exit status used when the user interrupts twice.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Loads the JSON config at `path`, or the built-in defaults without one.
pub fn load_config(path: Option<&Path>) -> CliResult<EncodingConfig> {
    match path {
        Some(path) => Ok(EncodingConfig::from_json_file(path)?),
        None => Ok(EncodingConfig::default()),
    }
}

/// Flags win over the config file; the result is validated.
pub fn build_settings(args: &EncodeArgs, config: &EncodingConfig) -> CliResult<EncodingSettings> {
    let mut settings = EncodingSettings::default();
    settings.set_codec(args.vcodec.as_deref().unwrap_or(&config.video_codec));
    settings.set_audio_codec(args.acodec.as_deref().unwrap_or(&config.audio_codec));
    settings.set_crf(args.crf.unwrap_or(config.crf))?;
    settings.set_preset(args.preset.as_deref().unwrap_or(&config.preset))?;
    Ok(settings)
}

/// Size saved by the encode, in percent of the input. Negative when the output grew.
pub fn reduction_percent(input_size: u64, output_size: u64) -> f64 {
    if input_size == 0 {
        return 0.0;
    }
    100.0 - (output_size as f64 / input_size as f64) * 100.0
}

/// Displays the paths and settings the encode will use.
fn display_initialization_info(input: &Path, output: &Path, settings: &EncodingSettings) {
    terminal::print_section("Initialization");
    terminal::print_status("Input file", &input.display().to_string(), false);
    terminal::print_status("Output file", &output.display().to_string(), false);
    terminal::print_status(
        "Video",
        &format!(
            "{} (crf {}, preset {})",
            settings.codec(),
            settings.crf(),
            settings.preset()
        ),
        false,
    );
    terminal::print_status(
        "Audio",
        &format!("{} {}", settings.audio_codec(), settings.audio_bitrate()),
        false,
    );
}

/// Wires the encoder callbacks to the progress bar and the terminal.
fn build_encoder(
    input: &Path,
    output: &Path,
    settings: &EncodingSettings,
    tools: &ToolPaths,
    progress: &EncodeProgress,
) -> Encoder {
    let log_progress = progress.clone();
    let state_progress = progress.clone();
    let started_progress = progress.clone();
    let tick_progress = progress.clone();

    Encoder::new(input, output, settings.to_options(), tools)
        .on_log(move |message| log_progress.suspend(|| info!("{message}")))
        .on_state_changed(move |state| {
            debug!("Encoder state: {state}");
            state_progress.set_state(state);
        })
        .on_started(move |options, media| {
            started_progress.suspend(|| {
                if let Some(media) = media {
                    terminal::print_processing(&media.summary());
                }
                terminal::print_status(
                    "Encoder options",
                    &format!("{} reported", options.len()),
                    false,
                );
            });
            for (key, value) in options {
                debug!("Effective option {key}={value}");
            }
        })
        .on_progress(move |update| tick_progress.update(update))
}

/// What a Ctrl-C press does, given the encoder state at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Ask the encoder to stop and remove the partial output.
    Cancel,
    /// Nothing to cancel, or a cancellation is already underway.
    Exit,
}

fn interrupt_action(state: EncodingState) -> InterruptAction {
    match state {
        EncodingState::Preparing | EncodingState::Encoding => InterruptAction::Cancel,
        _ => InterruptAction::Exit,
    }
}

/// Routes Ctrl-C to [`Encoder::cancel`] from a background thread.
fn watch_interrupts(encoder: Arc<Encoder>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Ctrl-C handling unavailable: {e}");
            return;
        }
    };

    let spawned = thread::Builder::new()
        .name("interrupt-watcher".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl-C: {e}");
                        return;
                    }
                    match interrupt_action(encoder.state()) {
                        InterruptAction::Cancel => {
                            warn!("Interrupt received, cancelling the encode");
                            encoder.cancel();
                        }
                        InterruptAction::Exit => {
                            error!("Interrupted, exiting");
                            process::exit(INTERRUPTED_EXIT_CODE);
                        }
                    }
                }
            });
        });
    if let Err(e) = spawned {
        warn!("Ctrl-C handling unavailable: {e}");
    }
}

/// Prints the result of the encode and converts a failure into an error.
fn handle_outcome(
    outcome: &EncodingOutcome,
    input: &Path,
    total_start_time: Instant,
) -> CliResult<()> {
    if !outcome.success {
        return Err(CliError::EncodingFailed(outcome.message.clone()));
    }

    terminal::print_section("Encoding complete");
    terminal::print_success(&outcome.message);

    if let Some(media) = &outcome.output {
        for line in media.summary_lines() {
            terminal::print_line(&line);
        }
        let input_size = fs::metadata(input).map_or(0, |m| m.len());
        let output_size = media.size();
        terminal::print_status("Input size", &format_bytes(input_size), false);
        terminal::print_status("Output size", &format_bytes(output_size), true);
        terminal::print_status(
            "Reduced by",
            &format!("{:.1}%", reduction_percent(input_size, output_size)),
            true,
        );
    }

    terminal::print_status(
        "Total time",
        &format_duration(total_start_time.elapsed().as_secs_f64()),
        true,
    );
    Ok(())
}

/// Runs the encode command and reports the result.
pub fn run_encode(args: EncodeArgs) -> CliResult<()> {
    let total_start_time = Instant::now();

    if !args.input.is_file() {
        return Err(CliError::MissingInput(args.input.clone()));
    }

    let config = load_config(args.config.as_deref())?;
    if !config.is_supported_input(&args.input) {
        warn!(
            "'{}' does not have a known video extension ({}); trying anyway",
            args.input.display(),
            config.supported_input_extensions.join(", ")
        );
    }
    let settings = build_settings(&args, &config)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.suggest_output_path(Some(&args.input)));

    let tools = args.tools.tool_paths();
    check_dependency(&tools.ffmpeg)?;
    check_dependency(&tools.ffprobe)?;

    display_initialization_info(&args.input, &output, &settings);

    let progress = EncodeProgress::new();
    let encoder = Arc::new(build_encoder(
        &args.input,
        &output,
        &settings,
        &tools,
        &progress,
    ));
    watch_interrupts(Arc::clone(&encoder));

    terminal::print_section("Encoding");
    let outcome = encoder.start();
    progress.finish();

    debug!("Finished at: {}", chrono::Local::now());
    handle_outcome(&outcome, &args.input, total_start_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use vidcoder_core::CoreError;

    fn encode_args(extra: &[&str]) -> EncodeArgs {
        let argv = ["vidcoder", "encode", "in.mkv"].iter().chain(extra);
        match Cli::parse_from(argv).command {
            Commands::Encode(args) => args,
            other => panic!("Expected Encode command, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_from_defaults() {
        let settings = build_settings(&encode_args(&[]), &EncodingConfig::default()).unwrap();
        assert_eq!(settings.codec(), "libx264");
        assert_eq!(settings.audio_codec(), "aac");
        assert_eq!(settings.crf(), 23);
        assert_eq!(settings.preset(), "medium");
    }

    #[test]
    fn test_flags_override_config() {
        let config = EncodingConfig {
            video_codec: "libx265".to_string(),
            crf: 28,
            preset: "slow".to_string(),
            ..EncodingConfig::default()
        };
        let args = encode_args(&["--crf", "18", "--acodec", "libopus"]);
        let settings = build_settings(&args, &config).unwrap();
        assert_eq!(settings.codec(), "libx265");
        assert_eq!(settings.audio_codec(), "libopus");
        assert_eq!(settings.crf(), 18);
        assert_eq!(settings.preset(), "slow");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = EncodingConfig::default();
        let err = build_settings(&encode_args(&["--crf", "60"]), &config).unwrap_err();
        assert!(matches!(err, CliError::Core(CoreError::Setting(_))));

        let err = build_settings(&encode_args(&["--preset", "ludicrous"]), &config).unwrap_err();
        assert!(err.to_string().contains("Invalid preset 'ludicrous'"));
    }

    #[test]
    fn test_load_config_without_path() {
        assert_eq!(load_config(None).unwrap(), EncodingConfig::default());
    }

    #[test]
    fn test_reduction_percent() {
        assert_eq!(reduction_percent(0, 100), 0.0);
        assert_eq!(reduction_percent(200, 50), 75.0);
        assert_eq!(reduction_percent(100, 150), -50.0);
    }

    #[test]
    fn test_interrupt_cancels_only_a_running_encode() {
        assert_eq!(interrupt_action(EncodingState::Preparing), InterruptAction::Cancel);
        assert_eq!(interrupt_action(EncodingState::Encoding), InterruptAction::Cancel);
        assert_eq!(interrupt_action(EncodingState::Cancelling), InterruptAction::Exit);
        assert_eq!(interrupt_action(EncodingState::Idle), InterruptAction::Exit);
        assert_eq!(interrupt_action(EncodingState::Completed), InterruptAction::Exit);
    }

    #[test]
    fn test_failed_outcome_is_error() {
        let outcome = EncodingOutcome {
            success: false,
            message: "Encoding cancelled by user".to_string(),
            output: None,
        };
        let err = handle_outcome(&outcome, Path::new("in.mkv"), Instant::now()).unwrap_err();
        assert_eq!(err.to_string(), "Encoding cancelled by user");
    }
}
