// Terminal host for idxv
// Scans a directory into slides and drives the viewer from stdin commands.
//
// Commands:
// - n / p: Next / previous slide (buttons)
// - g <i>: Go to index
// - s l / s r: Swipe left (next) / right (previous)
// - t <i>: Click thumbnail
// - k <key>: Send a key (left, right, home, end, esc, tab, backtab, enter, or a char)
// - + / - / 0: Zoom in / out / reset
// - z <scale>: Set scale
// - w <dy>: Wheel delta
// - c <w> <h>: Container size
// - f: Toggle fullscreen
// - d: Download active slide
// - o [i]: Open at index
// - x: Close, q: Quit

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use idxv::loader::ThreadedMediaLoader;
use idxv::preload::WorkerPrefetcher;
use idxv::scanner::FileScanner;
use idxv::timer::SystemClock;
use idxv::ui::{Key, SaveToDirectory, SwipeDirection};
use idxv::{OpenTarget, RendererSet, TextRenderer, ViewerConfig, ViewerShell, ViewerSnapshot};

/// How often timers and loader results are polled while idle.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("idxv=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let (dir, start) = parse_args(std::env::args().skip(1))?;
    let config = ViewerConfig::from_env();

    let slides = FileScanner::scan(&dir).await?;
    info!(count = slides.len(), "Scanned {:?}", dir);
    if slides.is_empty() {
        bail!("No supported media in {:?}", dir);
    }

    let mut shell = ViewerShell::builder(config.clone())
        .clock(SystemClock::shared())
        .prefetcher(WorkerPrefetcher::new(
            config.prefetch_workers,
            config.prefetch_cache_entries,
        ))
        .loader(ThreadedMediaLoader::new())
        .download_handler(SaveToDirectory::user_default())
        .build();
    shell.set_slides(slides);
    shell.set_container_size(1280.0, 800.0);
    shell.open(OpenTarget::Index(start))?;

    let renderers = RendererSet::uniform(TextRenderer).with_overlay(overlay);
    print_frame(&shell, &renderers);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match run_command(&mut shell, line.trim()) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => warn!("{:#}", e),
                }
                shell.tick();
                print_frame(&shell, &renderers);
            }
            _ = ticker.tick() => {
                let report = shell.tick();
                if report.recentered || report.loads_applied > 0 {
                    print_frame(&shell, &renderers);
                }
            }
        }
    }

    shell.close();
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(PathBuf, usize)> {
    let mut dir = None;
    let mut start = 0;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--start" => {
                let value = args.next().context("--start needs an index")?;
                start = value
                    .parse()
                    .with_context(|| format!("Invalid start index {:?}", value))?;
            }
            _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
            other => bail!("Unexpected argument {:?}", other),
        }
    }
    let dir = dir.context("Usage: idxv <dir> [--start N]")?;
    Ok((dir, start))
}

enum Flow {
    Continue,
    Quit,
}

fn run_command(shell: &mut ViewerShell, line: &str) -> Result<Flow> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(Flow::Continue);
    };
    let arg = parts.next();

    match command {
        "q" => return Ok(Flow::Quit),
        "n" => {
            shell.go_to_next();
        }
        "p" => {
            shell.go_to_prev();
        }
        "g" => {
            shell.go_to_index(parse(arg, "index")?);
        }
        "s" => {
            let direction = match arg {
                Some("l") => SwipeDirection::Left,
                Some("r") => SwipeDirection::Right,
                _ => bail!("Usage: s l|r"),
            };
            shell.swipe(direction);
        }
        "t" => {
            shell.thumbnail_clicked(parse(arg, "thumbnail index")?);
        }
        "k" => {
            let key = parse_key(arg.context("Usage: k <key>")?)?;
            info!(outcome = ?shell.handle_key(key), "Key {:?}", key);
        }
        "+" => shell.next_step(),
        "-" => shell.previous_step(),
        "0" => shell.reset_step(),
        "z" => shell.set_scale(parse(arg, "scale")?, true),
        "w" => shell.wheel(parse(arg, "wheel delta")?, None),
        "c" => {
            let width = parse(arg, "width")?;
            let height = parse(parts.next(), "height")?;
            shell.set_container_size(width, height);
        }
        "f" => {
            shell.toggle_fullscreen();
        }
        "d" => match shell.download()? {
            Some(path) => info!("Saved to {:?}", path),
            None => info!("Download handed off"),
        },
        "o" => {
            let index = arg.map(|_| parse(arg, "index")).transpose()?.unwrap_or(0);
            shell.open(OpenTarget::Index(index))?;
        }
        "x" => shell.close(),
        other => bail!("Unknown command {:?}", other),
    }
    Ok(Flow::Continue)
}

fn parse<T>(arg: Option<&str>, what: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = arg.with_context(|| format!("Missing {what}"))?;
    raw.parse()
        .with_context(|| format!("Invalid {what} {:?}", raw))
}

fn parse_key(raw: &str) -> Result<Key> {
    let key = match raw {
        "left" => Key::Left,
        "right" => Key::Right,
        "up" => Key::Up,
        "down" => Key::Down,
        "home" => Key::Home,
        "end" => Key::End,
        "esc" => Key::Escape,
        "enter" => Key::Enter,
        "space" => Key::Space,
        "tab" => Key::Tab,
        "backtab" => Key::BackTab,
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => bail!("Unknown key {:?}", raw),
            }
        }
    };
    Ok(key)
}

fn overlay(snapshot: &ViewerSnapshot) -> String {
    match (snapshot.open, snapshot.index) {
        (true, Some(index)) => {
            let mut line = format!("{}/{}", index + 1, snapshot.len);
            if let Some(control) = snapshot.focused_control {
                line.push_str(&format!(" focus={control}"));
            }
            if snapshot.fullscreen {
                line.push_str(" fullscreen");
            }
            line
        }
        _ => "closed".to_string(),
    }
}

fn print_frame(shell: &ViewerShell, renderers: &RendererSet<String>) {
    let frame = shell.render(renderers);
    for line in &frame.slides {
        println!("{line}");
    }
    if !frame.thumbnails.is_empty() {
        println!("{}", frame.thumbnails.join(" "));
    }
    if let Some(overlay) = frame.overlay {
        println!("-- {overlay}");
    }
}
