use std::fs;
use std::io::{self, IsTerminal, Read, Write};

use anyhow::{Context, Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "badge-caption",
    version,
    about = "Composite a caption onto the banner of a badge image"
)]
struct Cli {
    /// Caption text (read from stdin when omitted)
    text: Option<String>,

    /// Badge image to caption (png/jpeg/webp/...)
    #[arg(short = 'd', long = "data")]
    data: String,

    /// Output PNG path (written to stdout when omitted)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Layout mode: straight, bend or arc (overrides settings)
    #[arg(short = 'm', long = "mode")]
    mode: Option<String>,

    /// Primary font file (overrides settings)
    #[arg(short = 'F', long = "font")]
    font: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Print the banner anchor and glyph layout as JSON to stderr
    #[arg(long = "dump-layout")]
    dump_layout: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    badge_caption::logging::init(cli.verbose)?;

    let text = match cli.text {
        Some(text) => text,
        None => {
            if io::stdin().is_terminal() {
                return Err(anyhow!("no caption given (pass TEXT or pipe it on stdin)"));
            }
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let image_bytes =
        fs::read(&cli.data).with_context(|| format!("failed to read image: {}", cli.data))?;

    let config = badge_caption::Config {
        settings_path: cli.read_settings,
        mode: cli.mode,
        font_path: cli.font,
    };
    let outcome = badge_caption::run(&config, &image_bytes, text.trim())?;

    if cli.dump_layout {
        eprintln!("{}", badge_caption::format_outcome(&outcome)?);
    }
    match cli.output {
        Some(path) => {
            fs::write(&path, &outcome.png)
                .with_context(|| format!("failed to write output: {}", path))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&outcome.png)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
