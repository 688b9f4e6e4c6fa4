use std::path::PathBuf;

use ab_glyph::FontArc;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use image::Pixel;
use qrcard::{
    encode, parse_color, render, render_card, CardOptions, CardRequest, ECLevel, RenderOptions,
    DEFAULT_CARD_SIZE, MAX_CARD_SIZE, MIN_CARD_SIZE,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "qrcard", version, about = "Generate QR codes and preview cards")]
struct Cli {
    /// Text to encode
    #[arg(env = "QRCARD_TEXT")]
    text: String,

    #[arg(long, value_enum, default_value_t = EcArg::M, env = "QRCARD_EC_LEVEL")]
    ec_level: EcArg,

    /// Pixels per module
    #[arg(long, default_value_t = 8, env = "QRCARD_MODULE_SIZE")]
    module_size: u32,

    /// Quiet zone in modules [default: 4, 2 on cards]
    #[arg(long, env = "QRCARD_MARGIN")]
    margin: Option<u32>,

    #[arg(long, default_value = "000000", env = "QRCARD_DARK")]
    dark: String,

    #[arg(long, default_value = "ffffff", env = "QRCARD_LIGHT")]
    light: String,

    /// Image format follows the extension
    #[arg(short, long, default_value = "qr.png", env = "QRCARD_OUTPUT")]
    output: PathBuf,

    /// Print to the terminal instead of writing an image
    #[arg(long, conflicts_with = "card")]
    ascii: bool,

    /// Compose a preview card
    #[arg(long)]
    card: bool,

    /// Card side in pixels
    #[arg(long, default_value_t = DEFAULT_CARD_SIZE, env = "QRCARD_SIZE")]
    size: u32,

    /// Card background
    #[arg(long, default_value = "ffffff", env = "QRCARD_BG")]
    bg: String,

    #[arg(long, env = "QRCARD_TITLE")]
    title: Option<String>,

    #[arg(long, env = "QRCARD_FOOTER")]
    footer: Option<String>,

    /// TrueType or OpenType font for card text
    #[arg(long, env = "QRCARD_FONT")]
    font: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum EcArg {
    L,
    M,
    Q,
    H,
}

impl From<EcArg> for ECLevel {
    fn from(value: EcArg) -> Self {
        match value {
            EcArg::L => ECLevel::L,
            EcArg::M => ECLevel::M,
            EcArg::Q => ECLevel::Q,
            EcArg::H => ECLevel::H,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrcard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let qr = encode(cli.text.as_bytes(), cli.ec_level.into()).context("Failed to encode text")?;
    info!(version = *qr.version(), width = qr.width(), "Encoded {} bytes", cli.text.len());

    if cli.ascii {
        println!("{}", qr.to_str(1));
        return Ok(());
    }

    if cli.card {
        let font = cli.font.as_deref().map(load_font).transpose()?;
        let opts = card_options(&cli, font.as_ref())?;
        let card = render_card(&qr, &opts).context("Failed to render card")?;
        card.save(&cli.output)
            .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    } else {
        let dark = parse_color(&cli.dark).context("Invalid dark color")?;
        let light = parse_color(&cli.light).context("Invalid light color")?;
        let opts = RenderOptions {
            module_size: cli.module_size,
            margin: cli.margin.unwrap_or(RenderOptions::default().margin),
            dark: dark.to_rgb(),
            light: light.to_rgb(),
        };
        let img = render(&qr, &opts).context("Failed to render QR")?;
        img.save(&cli.output)
            .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    }

    info!(output = %cli.output.display(), "Image written");
    Ok(())
}

fn card_options(cli: &Cli, font: Option<&FontArc>) -> Result<CardOptions> {
    if font.is_none() && (cli.title.is_some() || cli.footer.is_some()) {
        bail!("Card text requires --font");
    }

    let req = CardRequest {
        payload: cli.text.clone().into_bytes(),
        dark: parse_color(&cli.dark).context("Invalid dark color")?,
        light: parse_color(&cli.light).context("Invalid light color")?,
        background: parse_color(&cli.bg).context("Invalid background color")?,
        title: cli.title.clone(),
        footer: cli.footer.clone(),
        size: cli.size.clamp(MIN_CARD_SIZE, MAX_CARD_SIZE),
    };
    let opts = req.card_options(font);
    Ok(CardOptions { margin: cli.margin.unwrap_or(opts.margin), ..opts })
}

fn load_font(path: &std::path::Path) -> Result<FontArc> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
    FontArc::try_from_vec(bytes).with_context(|| format!("Invalid font {}", path.display()))
}
