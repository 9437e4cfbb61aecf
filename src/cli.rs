use crate::color::ColorGenerator;
use crate::config::{Config, load_config};
use crate::legend::Legend;
use crate::render::write_output;
use crate::span::parse_spans;
use crate::view::{DependencyDiagram, DiagramView};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tddr", version, about = "Service dependency diagrams for distributed traces")]
pub struct Args {
    /// Span list (JSON array or {"spans": [...]}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON/SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// What to emit
    #[arg(short = 'e', long = "emit", value_enum, default_value = "graph")]
    pub emit: Emit,

    /// Node id to draw with `--emit node`, e.g. `hr:employee-service`
    #[arg(short = 'n', long = "node")]
    pub node: Option<String>,

    /// Image format for `node` and `legend`
    #[arg(short = 'f', long = "format", value_enum, default_value = "svg")]
    pub format: ImageFormat,

    /// Opacity handed to the node view, -1.0 (darker) to 1.0 (lighter)
    #[arg(long = "opacity", allow_hyphen_values = true)]
    pub opacity: Option<f32>,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Log graph construction details to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Graph widget payload as JSON
    Graph,
    /// One node icon
    Node,
    /// The legend overlay
    Legend,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(opacity) = args.opacity {
        config.render.opacity = opacity.clamp(-1.0, 1.0);
    }

    match args.emit {
        Emit::Graph => {
            ensure_text_format(args.emit, args.format)?;
            let json = match render_trace(&args, &config)? {
                Some(view) => view.payload(config.render.opacity)?.to_json()?,
                None => "null".to_string(),
            };
            write_output(&json, args.output.as_deref())?;
        }
        Emit::Node => {
            let node = args
                .node
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--node is required with --emit node"))?;
            let view = render_trace(&args, &config)?
                .ok_or_else(|| anyhow::anyhow!("Trace produced no dependency graph"))?;
            let svg = view.views.svg(node, config.render.opacity)?;
            write_image(&svg, &args, &config)?;
        }
        Emit::Legend => {
            let svg = Legend::render_svg(&config.theme);
            write_image(&svg, &args, &config)?;
        }
    }

    Ok(())
}

fn render_trace(args: &Args, config: &Config) -> Result<Option<DiagramView>> {
    let input = read_input(args.input.as_deref())?;
    let spans = parse_spans(&input)?;
    tracing::debug!(spans = spans.len(), "read spans");

    let colors = Arc::new(ColorGenerator::new(&config.theme));
    let diagram = DependencyDiagram::new(config.clone())?;
    Ok(diagram.render(spans, &colors)?)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn write_image(svg: &str, args: &Args, config: &Config) -> Result<()> {
    match args.format {
        ImageFormat::Svg => write_output(svg, args.output.as_deref())?,
        ImageFormat::Png => write_png(svg, args, config)?,
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, args: &Args, config: &Config) -> Result<()> {
    let output = ensure_output(&args.output, "png")?;
    crate::render::write_output_png(svg, &output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _args: &Args, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_text_format(emit: Emit, format: ImageFormat) -> Result<()> {
    if emit == Emit::Graph && format != ImageFormat::Svg {
        return Err(anyhow::anyhow!(
            "--format {:?} only applies to --emit node or legend; the graph payload is JSON",
            format
        ));
    }
    Ok(())
}

#[cfg_attr(not(feature = "png"), allow(dead_code))]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
