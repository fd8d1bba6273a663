use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use sticker_composer::{Composer, ComposerConfig, ExportFormat, FilterKind, StickerDrop};

#[derive(Parser, Debug)]
#[command(name = "sticker-composer", version)]
struct Cli {
    /// Base image; sets the output size.
    #[arg(long)]
    base: PathBuf,

    /// Raster sticker centered on a point, as `PATH@X,Y`. Repeatable.
    #[arg(long = "sticker", value_parser = parse_placed)]
    stickers: Vec<Placed>,

    /// SVG sticker centered on a point, as `PATH@X,Y`. Repeatable.
    #[arg(long = "svg-sticker", value_parser = parse_placed)]
    svg_stickers: Vec<Placed>,

    /// Caption along the top edge.
    #[arg(long)]
    top: Option<String>,

    /// Caption along the bottom edge.
    #[arg(long)]
    bottom: Option<String>,

    #[arg(long)]
    brightness: Option<f32>,

    #[arg(long)]
    contrast: Option<f32>,

    #[arg(long)]
    saturation: Option<f32>,

    #[arg(long)]
    noise: Option<f32>,

    /// Composer configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatChoice::Png)]
    format: FormatChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Bmp,
    Tiff,
    Jpeg,
}

impl From<FormatChoice> for ExportFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Png => ExportFormat::Png,
            FormatChoice::Bmp => ExportFormat::Bmp,
            FormatChoice::Tiff => ExportFormat::Tiff,
            FormatChoice::Jpeg => ExportFormat::Jpeg { quality: 90 },
        }
    }
}

/// An asset path plus the surface point it is dropped on.
#[derive(Clone, Debug)]
struct Placed {
    path: PathBuf,
    x: f32,
    y: f32,
}

fn parse_placed(s: &str) -> Result<Placed, String> {
    let (path, point) = s
        .rsplit_once('@')
        .ok_or_else(|| format!("expected PATH@X,Y, got '{s}'"))?;
    let (x, y) = point
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y after '@', got '{point}'"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("bad coordinate '{v}': {e}"))
    };
    Ok(Placed {
        path: PathBuf::from(path),
        x: coord(x)?,
        y: coord(y)?,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ComposerConfig::default(),
    };
    let mut composer = Composer::new(config)?;

    let base = read_bytes(&cli.base)?;
    composer
        .set_base_image(&base)
        .with_context(|| format!("load base image '{}'", cli.base.display()))?;

    for placed in &cli.stickers {
        let bytes = read_bytes(&placed.path)?;
        composer
            .add_sticker(&bytes, StickerDrop::at(placed.x, placed.y))
            .with_context(|| format!("add sticker '{}'", placed.path.display()))?;
    }
    for placed in &cli.svg_stickers {
        let svg = std::fs::read_to_string(&placed.path)
            .with_context(|| format!("read svg '{}'", placed.path.display()))?;
        composer
            .add_svg_sticker(svg, StickerDrop::at(placed.x, placed.y))
            .with_context(|| format!("add svg sticker '{}'", placed.path.display()))?;
    }

    composer.add_text(cli.top.as_deref(), cli.bottom.as_deref())?;

    for (kind, value) in [
        (FilterKind::Brightness, cli.brightness),
        (FilterKind::Contrast, cli.contrast),
        (FilterKind::Saturation, cli.saturation),
        (FilterKind::Noise, cli.noise),
    ] {
        if let Some(value) = value {
            composer
                .set_filter(kind, value)
                .with_context(|| format!("set {kind}"))?;
        }
    }

    let bytes = composer.export(cli.format.into())?;
    if let Some(parent) = cli.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&cli.out, bytes)
        .with_context(|| format!("write image '{}'", cli.out.display()))?;

    eprintln!("wrote {}", cli.out.display());
    Ok(())
}

fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read '{}'", path.display()))
}

fn read_config(path: &Path) -> anyhow::Result<ComposerConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("open config '{}'", path.display()))?;
    let config = ComposerConfig::from_json(&json)
        .with_context(|| format!("parse config '{}'", path.display()))?;
    Ok(config)
}
