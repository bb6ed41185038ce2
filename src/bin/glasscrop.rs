use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "glasscrop", version)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Canvas width override.
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Canvas height override.
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Log at DEBUG instead of INFO.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the background-only liquid-glass preview.
    Preview(PreviewArgs),
    /// Render the full composite (background + cropped card) to a file.
    Compose(ComposeArgs),
    /// Run pick, crop and save through the platform exporter.
    Save(SaveArgs),
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CropArgs {
    /// Explicit pixel crop as `x,y,width,height`.
    #[arg(long)]
    crop: Option<glasscrop::CropRect>,

    /// Crop view zoom (>= 1), used when `--crop` is absent.
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Crop view pan as normalized `x,y` in [-1, 1].
    #[arg(long, value_parser = parse_pan, default_value = "0,0")]
    pan: (f64, f64),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    crop: CropArgs,
}

#[derive(Parser, Debug)]
struct SaveArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Platform override.
    #[arg(long, value_enum)]
    platform: Option<PlatformChoice>,

    #[command(flatten)]
    crop: CropArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlatformChoice {
    Web,
    Mini,
}

fn parse_pan(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("pan '{s}' must be x,y"))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((x, y))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let cfg = load_config(&cli)?;
    match cli.cmd {
        Command::Preview(args) => cmd_preview(&cfg, args).await,
        Command::Compose(args) => cmd_compose(&cfg, args).await,
        Command::Save(args) => cmd_save(cfg, args).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<glasscrop::GlassConfig> {
    let mut cfg = match &cli.config {
        Some(path) => glasscrop::GlassConfig::from_json_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => glasscrop::GlassConfig::default(),
    };
    if let Some(w) = cli.width {
        cfg.canvas.width = w;
    }
    if let Some(h) = cli.height {
        cfg.canvas.height = h;
    }
    cfg.validate().context("validate config")?;
    Ok(cfg)
}

fn resolve_crop(args: &CropArgs, image: &glasscrop::PreparedImage) -> anyhow::Result<glasscrop::CropRect> {
    if let Some(rect) = args.crop {
        return Ok(rect);
    }
    Ok(glasscrop::CropRect::for_view(
        image.width,
        image.height,
        glasscrop::Aspect::PORTRAIT_3_4,
        args.zoom,
        args.pan,
    )?)
}

fn write_output(out: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, bytes).with_context(|| format!("write '{}'", out.display()))
}

async fn cmd_preview(cfg: &glasscrop::GlassConfig, args: PreviewArgs) -> anyhow::Result<()> {
    let compositor = glasscrop::Compositor::from_config(cfg);
    let source = glasscrop::ImageRef::path(&args.in_path);
    let preview = compositor
        .compose(&source, None)
        .await?
        .context("no drawing surface for the configured canvas")?;
    write_output(&args.out, &preview.bytes)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_compose(cfg: &glasscrop::GlassConfig, args: ComposeArgs) -> anyhow::Result<()> {
    let compositor = glasscrop::Compositor::from_config(cfg);
    let source = glasscrop::ImageRef::path(&args.in_path);
    let prepared = glasscrop::assets::load_image(&source, compositor.load_timeout).await?;
    let rect = resolve_crop(&args.crop, &prepared)?;
    let cropped = glasscrop::crop::crop_image(&prepared, rect, cfg.format, cfg.jpeg_quality)?;
    let cropped = glasscrop::assets::decode_image(&cropped.bytes)?;

    // The crop is both the glass background and the card.
    let frame = compositor
        .compose_prepared(&cropped, Some(&cropped))?
        .context("no drawing surface for the configured canvas")?;
    let encoded = glasscrop::encode::encode_frame(&frame, cfg.format, cfg.jpeg_quality)?;
    write_output(&args.out, &encoded.bytes)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_save(mut cfg: glasscrop::GlassConfig, args: SaveArgs) -> anyhow::Result<()> {
    if let Some(p) = args.platform {
        cfg.platform = match p {
            PlatformChoice::Web => glasscrop::Platform::Web,
            PlatformChoice::Mini => glasscrop::Platform::MiniProgram,
        };
    }

    let picker = glasscrop::FilePicker::new([args.in_path.clone()]);
    let pick_options = glasscrop::PickOptions {
        max_edge: cfg.pick_max_edge,
        ..glasscrop::PickOptions::default()
    };
    let mut page = glasscrop::PageController::new(
        glasscrop::Compositor::from_config(&cfg),
        Box::new(picker),
        glasscrop::exporter_for(&cfg),
        Arc::new(glasscrop::TracingNotifier),
    )
    .with_pick_options(pick_options);

    let ticket = page.select_image().context("select image")?;
    page.refresh_preview(&ticket).await.context("render preview")?;

    let source = glasscrop::assets::load_image(&ticket.background, cfg.load_timeout()).await?;
    let rect = resolve_crop(&args.crop, &source)?;
    let ticket = page.confirm_crop(rect).await.context("crop")?;
    page.refresh_preview(&ticket).await.context("render preview")?;

    let receipt = page.save().await.context("save")?;
    eprintln!("wrote {}", receipt.path.display());
    Ok(())
}
