#![deny(unsafe_code)]
//! CLI binary for the shader reference-image generator.
//!
//! Subcommands:
//! - `render [fragment]`: render a fragment shader once, write the image
//! - `compare <reference> <candidate>`: pixel-compare two images

mod error;
mod logging;

use clap::{ArgAction, Parser, Subcommand};
use error::CliError;
use logging::{init_logging, LoggingConfig};
use shader_fixture_core::compare::{
    compare_files, Thresholds, DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_ERROR_RATIO,
    DEFAULT_WARNING_THRESHOLD,
};
use shader_fixture_core::config::{DEFAULT_FRAGMENT, DEFAULT_OUTPUT};
use shader_fixture_core::encode::format_for_path;
use shader_fixture_core::preprocess::{include_dir_for, SPECTRAL_INCLUDE_FILE};
use shader_fixture_core::render::generate_reference;
use shader_fixture_core::RenderConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "shader-fixture",
    about = "Render a fragment shader to a reference image for pixel-comparison tests"
)]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a fragment shader to a still image.
    Render {
        /// Fragment shader source. `spectral.glsl` must sit next to it.
        #[arg(default_value = DEFAULT_FRAGMENT)]
        fragment: PathBuf,

        /// Image width in pixels [default: 512].
        #[arg(short = 'W', long)]
        width: Option<u32>,

        /// Image height in pixels [default: 512].
        #[arg(short = 'H', long)]
        height: Option<u32>,

        /// Value bound to `u_time` [default: 0.0].
        #[arg(long)]
        time: Option<f32>,

        /// JSON file with `width`, `height` and `time`. Flags take precedence.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output image path (png, bmp or tiff).
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Compare a rendered image against a reference.
    Compare {
        /// Reference image.
        reference: PathBuf,

        /// Image to check.
        candidate: PathBuf,

        /// Largest per-pixel error that still counts as a match.
        #[arg(long, default_value_t = DEFAULT_ERROR_THRESHOLD)]
        error_threshold: f32,

        /// Per-pixel error above which a pixel counts as an error.
        #[arg(long, default_value_t = DEFAULT_WARNING_THRESHOLD)]
        warning_threshold: f32,

        /// Largest tolerated fraction of error pixels.
        #[arg(long, default_value_t = DEFAULT_MAX_ERROR_RATIO)]
        max_error_ratio: f32,
    },
}

/// Builds the render config: flags override the config file, which
/// overrides the defaults.
fn resolve_config(
    config: Option<&Path>,
    width: Option<u32>,
    height: Option<u32>,
    time: Option<f32>,
) -> Result<RenderConfig, CliError> {
    let mut resolved = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
            RenderConfig::from_json_str(&text)?
        }
        None => RenderConfig::default(),
    };
    if let Some(w) = width {
        resolved.width = w;
    }
    if let Some(h) = height {
        resolved.height = h;
    }
    if let Some(t) = time {
        resolved.time = t;
    }
    resolved
        .validate()
        .map_err(|e| CliError::Input(e.to_string()))?;
    Ok(resolved)
}

/// Both input files must exist, and the output must name a supported
/// format, before any GPU work starts.
fn check_inputs(fragment: &Path, output: &Path) -> Result<(), CliError> {
    format_for_path(output).map_err(|e| CliError::Input(e.to_string()))?;
    if !fragment.is_file() {
        return Err(CliError::Io(format!("{} not found", fragment.display())));
    }
    let include = include_dir_for(fragment).join(SPECTRAL_INCLUDE_FILE);
    if !include.is_file() {
        return Err(CliError::Io(format!("{} not found", include.display())));
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Render {
            fragment,
            width,
            height,
            time,
            config,
            output,
        } => {
            let config = resolve_config(config.as_deref(), width, height, time)?;
            check_inputs(&fragment, &output)?;

            let written = generate_reference(&fragment, &output, &config)?;

            if cli.json {
                let info = serde_json::json!({
                    "fragment": fragment.display().to_string(),
                    "output": written.display().to_string(),
                    "config": config,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "Reference image saved to {} ({}x{})",
                    written.display(),
                    config.width,
                    config.height
                );
            }
        }
        Command::Compare {
            reference,
            candidate,
            error_threshold,
            warning_threshold,
            max_error_ratio,
        } => {
            let thresholds = Thresholds {
                error: error_threshold,
                warning: warning_threshold,
            };
            thresholds.validate().map_err(CliError::Input)?;
            if !(0.0..=1.0).contains(&max_error_ratio) {
                return Err(CliError::Input(format!(
                    "--max-error-ratio must be within [0, 1], got {max_error_ratio}"
                )));
            }

            let stats = compare_files(&reference, &candidate, thresholds)?;
            let passed = stats.passes(max_error_ratio);

            if cli.json {
                let info = serde_json::json!({
                    "reference": reference.display().to_string(),
                    "candidate": candidate.display().to_string(),
                    "thresholds": thresholds,
                    "stats": stats,
                    "passed": passed,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Total pixels:     {}", stats.total_pixels);
                println!("Match ratio:      {:.2}%", stats.match_ratio() * 100.0);
                println!("Acceptable ratio: {:.2}%", stats.acceptable_ratio() * 100.0);
                println!("Warning ratio:    {:.2}%", stats.warning_ratio() * 100.0);
                println!("Error ratio:      {:.2}%", stats.error_ratio() * 100.0);
                println!(
                    "1% error pixels:  {} ({:.2}%)",
                    stats.one_percent_pixels,
                    stats.one_percent_ratio() * 100.0
                );
                println!("Max error:        {:.4}", stats.max_error);
            }

            if !passed {
                return Err(CliError::Mismatch(format!(
                    "{:.2}% of pixels exceed the warning threshold (allowed {:.2}%)",
                    stats.error_ratio() * 100.0,
                    max_error_ratio * 100.0
                )));
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_verbosity(cli.verbose));
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_defaults_match_the_reference_fixture() {
        let cli = Cli::try_parse_from(["shader-fixture", "render"]).unwrap();
        match cli.command {
            Command::Render {
                fragment, output, ..
            } => {
                assert_eq!(fragment, PathBuf::from("generate_reference.frag"));
                assert_eq!(output, PathBuf::from("SpectralMixReference.png"));
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn resolve_config_defaults_to_512_square() {
        let config = resolve_config(None, None, None, None).ok().unwrap();
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn resolve_config_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        fs::write(&path, r#"{"width": 64, "height": 32, "time": 1.0}"#).unwrap();

        let config = resolve_config(Some(&path), Some(128), None, None).ok().unwrap();
        assert_eq!(config.width, 128);
        assert_eq!(config.height, 32);
        assert_eq!(config.time, 1.0);
    }

    #[test]
    fn resolve_config_rejects_zero_size() {
        let err = resolve_config(None, Some(0), None, None).err().unwrap();
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn check_inputs_requires_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_inputs(&dir.path().join("generate_reference.frag"), Path::new("out.png"))
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 11);
        assert!(err.to_string().contains("generate_reference.frag"));
    }

    #[test]
    fn check_inputs_requires_spectral_include() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("generate_reference.frag");
        fs::write(&frag, "void main() {}").unwrap();

        let out = dir.path().join("out.png");
        let err = check_inputs(&frag, &out).err().unwrap();
        assert_eq!(err.exit_code(), 11);
        assert!(err.to_string().contains("spectral.glsl"));

        fs::write(dir.path().join("spectral.glsl"), "").unwrap();
        assert!(check_inputs(&frag, &out).is_ok());
    }

    #[test]
    fn check_inputs_rejects_lossy_output_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("generate_reference.frag");
        fs::write(&frag, "void main() {}").unwrap();
        fs::write(dir.path().join("spectral.glsl"), "").unwrap();

        let err = check_inputs(&frag, &dir.path().join("out.jpg")).err().unwrap();
        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().contains("jpg"));
    }

    #[test]
    fn malformed_config_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        fs::write(&path, "{width: ").unwrap();

        let err = resolve_config(Some(&path), None, None, None).err().unwrap();
        assert_eq!(err.exit_code(), 12);
    }
}
