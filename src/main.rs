use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use rockets::options::{parse_option_pair, parse_options_json};
use rockets::random::RandomSource;
use rockets::scheduler::{Clock, SystemClock};
use rockets::terminal::TerminalCanvas;
use rockets::{
    CanvasEffect, CanvasHandle, ConfigError, DEFAULT_TIMEOUT, EffectOptions, FrameQueue,
    RocketsEffect,
};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Stdout, Write, stdout};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{Level, debug, info};

// One display refresh at ~60 Hz
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(
    name = "rockets",
    version,
    about = "Rockets rising across the terminal",
    after_help = "Press 'q', ESC, or Ctrl+C to exit"
)]
struct Cli {
    /// Number of rockets in flight (overrides maxCount from --options)
    #[arg(long, value_name = "N")]
    max_count: Option<u64>,

    /// Stop after this many milliseconds; 0 runs until quit
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout: u64,

    /// Effect options as a JSON object, e.g. '{"maxCount": 80}'
    #[arg(long, value_name = "JSON", value_parser = parse_options_json)]
    options: Option<Map<String, Value>>,

    /// Single effect option; the value is read as JSON, else as a string
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_option_pair)]
    option: Vec<(String, Value)>,

    /// Background color as hex (e.g. --bg-color 1a1b26)
    #[arg(long, value_name = "RRGGBB", value_parser = parse_hex_color)]
    bg_color: Option<(u8, u8, u8)>,

    /// Write logs to this file (the terminal is busy drawing)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: Level,
}

impl Cli {
    fn effect_options(&self) -> EffectOptions {
        let mut overrides = self.options.clone().unwrap_or_default();
        for (key, value) in &self.option {
            overrides.insert(key.clone(), value.clone());
        }
        if let Some(count) = self.max_count {
            overrides.insert(rockets::options::MAX_COUNT_KEY.to_string(), Value::from(count));
        }
        EffectOptions::from_overrides(overrides)
    }

    fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }
}

fn parse_hex_color(hex: &str) -> Result<(u8, u8, u8), ConfigError> {
    let invalid = || ConfigError::InvalidHexColor {
        input: hex.to_string(),
    };
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(invalid());
    }

    let r = u8::from_str_radix(&digits[0..2], 16).map_err(|_| invalid())?;
    let g = u8::from_str_radix(&digits[2..4], 16).map_err(|_| invalid())?;
    let b = u8::from_str_radix(&digits[4..6], 16).map_err(|_| invalid())?;

    Ok((r, g, b))
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = &cli.log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn write_restore<W: Write>(out: &mut W) -> std::io::Result<()> {
    execute!(out, Show, LeaveAlternateScreen)
}

// A panic mid-frame would otherwise leave the shell in raw mode on the
// alternate screen.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = write_restore(&mut stdout());
        let _ = terminal::disable_raw_mode();
        default_hook(info);
    }));
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('q')
        || key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn run_effect(
    stdout: &mut BufWriter<Stdout>,
    effect: &mut dyn CanvasEffect,
    timeout: Option<Duration>,
    bg_color: Option<(u8, u8, u8)>,
    clock: impl Clock + 'static,
) -> std::io::Result<()> {
    let (cols, rows) = terminal::size()?;
    let canvas = Rc::new(RefCell::new(TerminalCanvas::new(
        cols as usize,
        rows as usize,
        bg_color,
    )));
    let handle: CanvasHandle = canvas.clone();
    let mut queue = FrameQueue::new(clock);

    effect.start(Some(&handle), timeout, &mut queue);

    let mut next_frame = Instant::now();
    loop {
        let wait = next_frame.saturating_duration_since(Instant::now());
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(key) if is_quit(&key) => {
                    effect.stop();
                    break;
                }
                Event::Resize(cols, rows) => {
                    debug!(cols, rows, "terminal resized");
                    canvas.borrow_mut().resize(cols as usize, rows as usize);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => {}
            }
            continue;
        }

        next_frame = Instant::now() + FRAME_INTERVAL;
        queue.dispatch(effect);
        canvas.borrow_mut().present(stdout)?;

        if queue.is_idle() {
            break;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let options = cli.effect_options();
    info!(max_count = options.max_count, timeout_ms = cli.timeout, "launching rockets");

    let clock = SystemClock::new();
    let rng: Box<dyn RandomSource> = Box::new(fastrand::Rng::new());
    let mut effect = RocketsEffect::with_sources(options, Box::new(clock), rng);

    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    install_panic_hook();
    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;

    let result = run_effect(&mut stdout, &mut effect, cli.timeout(), cli.bg_color, clock);

    write_restore(&mut stdout)?;
    terminal::disable_raw_mode()?;

    result?;
    info!("rockets done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(parse_hex_color("1a1b26").unwrap(), (0x1a, 0x1b, 0x26));
        assert_eq!(parse_hex_color("#FFFFFF").unwrap(), (255, 255, 255));
        assert!(parse_hex_color("12345").is_err());
        assert!(parse_hex_color("zzzzzz").is_err());
        assert!(parse_hex_color("ééé").is_err());
    }

    #[test]
    fn restore_shows_cursor_and_leaves_alternate_screen() {
        let mut out = Vec::new();
        write_restore(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[?25h"), "{text:?}");
        assert!(text.contains("\x1b[?1049l"), "{text:?}");
    }

    #[test]
    fn huge_max_count_flag_falls_back_to_default() {
        let cli = Cli::parse_from(["rockets", "--max-count", "18446744073709551615"]);
        assert_eq!(cli.effect_options().max_count, rockets::options::DEFAULT_MAX_COUNT);
    }

    #[test]
    fn max_count_flag_beats_option_bags() {
        let cli = Cli::parse_from([
            "rockets",
            "--options",
            r#"{"maxCount": 10, "theme": "dark"}"#,
            "-o",
            "maxCount=20",
            "--max-count",
            "30",
        ]);
        let options = cli.effect_options();
        assert_eq!(options.max_count, 30);
        assert_eq!(options.extra("theme"), Some(&Value::from("dark")));
    }

    #[test]
    fn option_pairs_override_the_json_bag() {
        let cli = Cli::parse_from(["rockets", "--options", r#"{"maxCount": 10}"#, "-o", "maxCount=20"]);
        assert_eq!(cli.effect_options().max_count, 20);
    }

    #[test]
    fn zero_timeout_disables_auto_stop() {
        let cli = Cli::parse_from(["rockets", "--timeout", "0"]);
        assert_eq!(cli.timeout(), None);
        let cli = Cli::parse_from(["rockets"]);
        assert_eq!(cli.timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(cli.log_level, Level::INFO);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["rockets", "--bg-color", "nope"]).is_err());
        assert!(Cli::try_parse_from(["rockets", "-o", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["rockets", "--options", "[1]"]).is_err());
    }
}
