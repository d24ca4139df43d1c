//! Blockfall: falling-block puzzle game in the terminal.

mod app;
mod audio;
mod game;
mod input;
mod piece;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub scoring: ScoringRule,
    pub seed: Option<u64>,
    pub frame_rate: u32,
    pub no_menu: bool,
    pub no_animation: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringRule::Exponential,
            seed: None,
            frame_rate: 60,
            no_menu: false,
            no_animation: false,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), args.log_level)?;
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(t) => t,
        Err(err) => {
            tracing::warn!(error = %err, "theme not loaded, using default");
            let mut t = theme::Theme::default();
            t.apply_palette(args.palette);
            t
        }
    };
    let config = GameConfig {
        scoring: args.scoring,
        seed: args.seed,
        frame_rate: args.frame_rate,
        no_menu: args.no_menu,
        no_animation: args.no_animation,
    };
    tracing::info!(?config, "starting blockfall");
    let music = audio::Music::open(args.music.as_deref(), args.volume, args.muted);
    let mut app = App::new(config, theme, music);
    app.run()?;
    tracing::info!("exited");
    Ok(())
}

/// Logs go to a file: the terminal belongs to the game screen. No file, no logging.
fn init_logging(path: Option<&Path>, level: tracing::Level) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Falling-block puzzle in the terminal. Fill rows to clear them; don't let the stack reach the top.",
    long_about = "Blockfall is a terminal falling-block puzzle.\n\n\
        Pieces fall one row per second on a 14x30 board. Complete a row to clear it; \
        clearing several at once is worth more (10, 20, 40, 80).\n\n\
        CONTROLS:\n  Left/Right or h/l  Move      Up or k      Rotate\n  Down or j          Soft drop\n  \
        Enter/Space        Start / restart      e  End game\n  m                  Music on/off         q / Esc  Quit"
)]
pub struct Args {
    /// Line-clear scoring: exponential (10, 20, 40, 80) or linear (10 per clear).
    #[arg(long, default_value = "exponential")]
    pub scoring: ScoringRule,

    /// Seed for the piece generator (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip the title screen and start immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Frames (and drop-timer ticks) per second.
    #[arg(
        long,
        default_value_t = 60,
        value_name = "HZ",
        value_parser = clap::value_parser!(u32).range(1..=240)
    )]
    pub frame_rate: u32,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Background track to loop while playing (needs the `audio` feature).
    #[arg(long, value_name = "FILE")]
    pub music: Option<PathBuf>,

    /// Music volume, 0.0 to 1.0.
    #[arg(long, default_value_t = audio::DEFAULT_VOLUME, value_name = "V")]
    pub volume: f32,

    /// Start with music paused.
    #[arg(long)]
    pub muted: bool,

    /// Write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScoringRule {
    /// 10 * 2^(rows - 1) per lock.
    #[default]
    Exponential,
    /// 10 per lock that clears anything.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let args = Args::try_parse_from(["blockfall"]).unwrap();
        assert_eq!(args.scoring, ScoringRule::Exponential);
        assert_eq!(args.palette, Palette::Normal);
        assert_eq!(args.log_level, tracing::Level::INFO);
        assert!((args.volume - audio::DEFAULT_VOLUME).abs() < f32::EPSILON);
        assert!(args.seed.is_none());
        assert_eq!(args.frame_rate, 60);
    }

    #[test]
    fn cli_rejects_bad_frame_rate() {
        for bad in ["nan", "inf", "0", "-5", "241", "30.5"] {
            assert!(
                Args::try_parse_from(["blockfall", "--frame-rate", bad]).is_err(),
                "{}",
                bad
            );
        }
        let args = Args::try_parse_from(["blockfall", "--frame-rate", "240"]).unwrap();
        assert_eq!(args.frame_rate, 240);
    }

    #[test]
    fn cli_parses_variants() {
        let args = Args::try_parse_from([
            "blockfall",
            "--scoring",
            "linear",
            "--seed",
            "5",
            "--palette",
            "contrast",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.scoring, ScoringRule::Linear);
        assert_eq!(args.seed, Some(5));
        assert_eq!(args.palette, Palette::HighContrast);
        assert_eq!(args.log_level, tracing::Level::DEBUG);
    }
}
