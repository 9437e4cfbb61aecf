use crate::color::ColorGenerator;
use crate::config::Config;
use crate::error::Result;
use crate::graph::GraphLink;
use crate::legend::{LEGEND_FADE_MS, LEGEND_PLACEMENT, Legend, LegendEntry, LegendState};
use crate::span::parse_spans;
use crate::theme::Theme;
use crate::view::{DependencyDiagram, DiagramView};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub config: Config,
}

impl RenderOptions {
    pub fn cellery() -> Self {
        Self::default()
    }

    pub fn dark() -> Self {
        let mut config = Config::default();
        config.theme = Theme::dark();
        config.render.background = config.theme.background.clone();
        Self { config }
    }
}

/// What the graph widget consumes: nodes with ready-made icons, links and
/// the legend overlay description.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramPayload {
    pub id: String,
    pub graph_type: String,
    pub node_data: Vec<NodePayload>,
    pub edge_data: Vec<GraphLink>,
    pub legend: LegendPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePayload {
    pub id: String,
    pub color: String,
    pub size: u32,
    pub radius: f32,
    pub duration: u64,
    pub has_error: bool,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendPayload {
    pub button_label: &'static str,
    pub popper_id: Option<&'static str>,
    pub open: bool,
    pub placement: &'static str,
    pub fade_ms: u32,
    pub entries: Vec<LegendEntry>,
}

impl LegendPayload {
    pub fn from_state(state: &LegendState, button_label: &'static str) -> Self {
        Self {
            button_label,
            popper_id: state.popper_id(),
            open: state.open,
            placement: LEGEND_PLACEMENT,
            fade_ms: LEGEND_FADE_MS,
            entries: Legend::entries(),
        }
    }
}

impl DiagramPayload {
    pub fn from_view(view: &DiagramView, opacity: f32) -> Result<Self> {
        let mut node_data = Vec::with_capacity(view.graph.nodes.len());
        for node in &view.graph.nodes {
            node_data.push(NodePayload {
                id: node.id.clone(),
                color: node.color.clone(),
                size: node.size,
                radius: view.views.radius(&node.id).unwrap_or_default(),
                duration: node.span.duration,
                has_error: node.span.has_error(),
                image: view.view(&node.id, opacity)?,
            });
        }
        Ok(Self {
            id: view.graph_id.clone(),
            graph_type: view.graph_type.clone(),
            node_data,
            edge_data: view.graph.links.clone(),
            legend: LegendPayload::from_state(&view.legend, view.legend_button),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parses spans and renders the widget payload as JSON. An empty diagram
/// comes back as `null`.
pub fn render_with_options(spans_json: &str, options: RenderOptions) -> Result<String> {
    let spans = parse_spans(spans_json)?;
    let colors = Arc::new(ColorGenerator::new(&options.config.theme));
    let opacity = options.config.render.opacity;
    let diagram = DependencyDiagram::new(options.config)?;
    match diagram.render(spans, &colors)? {
        Some(view) => view.payload(opacity)?.to_json(),
        None => Ok("null".to_string()),
    }
}

pub fn write_output(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, contents)?;
        }
        None => {
            print!("{}", contents);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &crate::config::RenderConfig) -> anyhow::Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size();
    let width = (size.width() * render_cfg.scale).ceil() as u32;
    let height = (size.height() * render_cfg.scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    if let Some(color) = parse_background(&render_cfg.background) {
        pixmap.fill(color);
    }

    let transform = resvg::tiny_skia::Transform::from_scale(render_cfg.scale, render_cfg.scale);
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, transform, &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(feature = "png")]
fn parse_background(color: &str) -> Option<resvg::tiny_skia::Color> {
    let hex = color.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(resvg::tiny_skia::Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255))
}
