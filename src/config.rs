use crate::error::Result;
use crate::system::{ISTIO_MIXER_NAME_PATTERN, SIDECAR_AUTH_FILTER_OPERATION_NAME_PATTERN};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    pub min_radius: f32,
    pub max_radius: f32,
    /// Node size handed to the graph widget.
    pub node_size: u32,
    /// Nodes with this id take the system color regardless of cell.
    pub global_gateway: String,
    pub icon_size: f32,
    pub outline_shade: f32,
    pub outline_width: f32,
    pub error_badge_scale: f32,
    pub error_badge_x: f32,
    pub error_badge_gap: f32,
    pub graph_id: String,
    pub graph_type: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            min_radius: 60.0,
            max_radius: 120.0,
            node_size: 350,
            global_gateway: "global-gateway".to_string(),
            icon_size: 240.0,
            outline_shade: -0.08,
            outline_width: 5.0,
            error_badge_scale: 0.35,
            error_badge_x: 150.0,
            error_badge_gap: 30.0,
            graph_id: "graph-id".to_string(),
            graph_type: "trace-dependency".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub sidecar_auth_operation_pattern: String,
    pub mixer_service_pattern: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sidecar_auth_operation_pattern: SIDECAR_AUTH_FILTER_OPERATION_NAME_PATTERN.to_string(),
            mixer_service_pattern: ISTIO_MIXER_NAME_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Opacity passed to the node view callback when icons are rendered up front.
    pub opacity: f32,
    /// Raster scale for PNG output.
    pub scale: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            opacity: 0.0,
            scale: 1.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub diagram: DiagramConfig,
    pub filter: FilterConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::cellery();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            diagram: DiagramConfig::default(),
            filter: FilterConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    help_font_size: Option<NumberOrString>,
    palette: Option<Vec<String>>,
    system_color: Option<String>,
    error_color: Option<String>,
    unknown_color: Option<String>,
    text_color: Option<String>,
    secondary_text_color: Option<String>,
    action_color: Option<String>,
    legend_background: Option<String>,
    legend_border: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramConfigFile {
    min_radius: Option<NumberOrString>,
    max_radius: Option<NumberOrString>,
    node_size: Option<u32>,
    global_gateway: Option<String>,
    outline_shade: Option<NumberOrString>,
    error_badge_scale: Option<NumberOrString>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterConfigFile {
    sidecar_auth_operation_pattern: Option<String>,
    mixer_service_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    opacity: Option<NumberOrString>,
    scale: Option<NumberOrString>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f32>().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    diagram: Option<DiagramConfigFile>,
    filter: Option<FilterConfigFile>,
    render: Option<RenderConfigFile>,
}

/// Loads a JSON (or JSON5) config file over the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    match parsed.theme.as_deref() {
        Some("dark") => config.theme = Theme::dark(),
        Some("default" | "cellery") | None => {}
        Some(other) => tracing::warn!(theme = other, "unknown theme, keeping default"),
    }

    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config.theme, vars);
    }
    config.render.background = config.theme.background.clone();

    if let Some(diagram) = parsed.diagram {
        if let Some(v) = diagram.min_radius.as_ref().and_then(NumberOrString::as_f32) {
            config.diagram.min_radius = v;
        }
        if let Some(v) = diagram.max_radius.as_ref().and_then(NumberOrString::as_f32) {
            config.diagram.max_radius = v;
        }
        if let Some(v) = diagram.node_size {
            config.diagram.node_size = v;
        }
        if let Some(v) = diagram.global_gateway {
            config.diagram.global_gateway = v;
        }
        if let Some(v) = diagram.outline_shade.as_ref().and_then(NumberOrString::as_f32) {
            config.diagram.outline_shade = v;
        }
        if let Some(v) = diagram.error_badge_scale.as_ref().and_then(NumberOrString::as_f32) {
            config.diagram.error_badge_scale = v;
        }
        if config.diagram.min_radius > config.diagram.max_radius {
            tracing::warn!(
                min = config.diagram.min_radius,
                max = config.diagram.max_radius,
                "minRadius exceeds maxRadius, swapping"
            );
            std::mem::swap(&mut config.diagram.min_radius, &mut config.diagram.max_radius);
        }
    }

    if let Some(filter) = parsed.filter {
        if let Some(v) = filter.sidecar_auth_operation_pattern {
            config.filter.sidecar_auth_operation_pattern = v;
        }
        if let Some(v) = filter.mixer_service_pattern {
            config.filter.mixer_service_pattern = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.opacity.as_ref().and_then(NumberOrString::as_f32) {
            config.render.opacity = v.clamp(-1.0, 1.0);
        }
        if let Some(v) = render.scale.as_ref().and_then(NumberOrString::as_f32) {
            if v > 0.0 {
                config.render.scale = v;
            } else {
                tracing::warn!(scale = v, "ignoring non-positive render scale");
            }
        }
    }

    Ok(config)
}

fn apply_theme_variables(theme: &mut Theme, vars: ThemeVariables) {
    if let Some(v) = vars.font_family {
        theme.font_family = v;
    }
    if let Some(v) = vars.font_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.font_size = v;
    }
    if let Some(v) = vars.help_font_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.help_font_size = v;
    }
    if let Some(v) = vars.palette.filter(|palette| !palette.is_empty()) {
        theme.palette = v;
    }
    if let Some(v) = vars.system_color {
        theme.system_color = v;
    }
    if let Some(v) = vars.error_color {
        theme.error_color = v;
    }
    if let Some(v) = vars.unknown_color {
        theme.unknown_color = v;
    }
    if let Some(v) = vars.text_color {
        theme.text_color = v;
    }
    if let Some(v) = vars.secondary_text_color {
        theme.secondary_text_color = v;
    }
    if let Some(v) = vars.action_color {
        theme.action_color = v;
    }
    if let Some(v) = vars.legend_background {
        theme.legend_background = v;
    }
    if let Some(v) = vars.legend_border {
        theme.legend_border = v;
    }
    if let Some(v) = vars.background {
        theme.background = v;
    }
}
