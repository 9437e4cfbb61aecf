use std::sync::Arc;

use serde::Deserialize;
use trace_dependency_diagram::{
    ColorGenerator, DependencyDiagram, DiagramView, RenderOptions, parse_spans, render_with_options,
};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    opacity: Option<f32>,
    min_radius: Option<f32>,
    max_radius: Option<f32>,
}

fn build_render_options(options: DiagramRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("dark") {
        RenderOptions::dark()
    } else {
        RenderOptions::cellery()
    };

    if let Some(font_family) = options.font_family {
        render_options.config.theme.font_family = font_family;
    }
    if let Some(opacity) = options.opacity {
        render_options.config.render.opacity = opacity.clamp(-1.0, 1.0);
    }
    if let Some(min_radius) = options.min_radius {
        render_options.config.diagram.min_radius = min_radius;
    }
    if let Some(max_radius) = options.max_radius {
        render_options.config.diagram.max_radius = max_radius;
    }

    render_options
}

fn parse_options(options_json: Option<String>) -> Result<DiagramRenderOptions, JsValue> {
    match options_json {
        Some(raw_options) => serde_json::from_str::<DiagramRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(DiagramRenderOptions::default()),
    }
}

/// Renders the graph widget payload for a span list; `"null"` when there is
/// nothing to draw.
#[wasm_bindgen]
pub fn render_dependency_graph(spans_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let render_options = build_render_options(parse_options(options_json)?);
    render_with_options(spans_json, render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Keeps a rendered diagram alive so the widget can ask for node icons
/// at whatever opacity it is currently drawing with.
#[wasm_bindgen]
pub struct DependencyDiagramHandle {
    view: DiagramView,
}

#[wasm_bindgen]
impl DependencyDiagramHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(spans_json: &str, options_json: Option<String>) -> Result<DependencyDiagramHandle, JsValue> {
        let to_js = |error: trace_dependency_diagram::DiagramError| JsValue::from_str(&error.to_string());
        let render_options = build_render_options(parse_options(options_json)?);
        let spans = parse_spans(spans_json).map_err(to_js)?;
        let colors = Arc::new(ColorGenerator::new(&render_options.config.theme));
        let diagram = DependencyDiagram::new(render_options.config).map_err(to_js)?;
        let view = diagram
            .render(spans, &colors)
            .map_err(to_js)?
            .ok_or_else(|| JsValue::from_str("trace produced no dependency graph"))?;
        Ok(Self { view })
    }

    /// Node view callback: a `data:` URI for `node_id`.
    pub fn view(&self, node_id: &str, opacity: f32) -> Result<String, JsValue> {
        self.view
            .view(node_id, opacity)
            .map_err(|error| JsValue::from_str(&error.to_string()))
    }

    /// Node click callback: the clicked node's span as JSON.
    #[wasm_bindgen(js_name = clickNode)]
    pub fn click_node(&self, node_id: &str) -> Option<String> {
        self.view
            .click_node(node_id)
            .and_then(|span| serde_json::to_string(span).ok())
    }
}

#[cfg(test)]
mod tests {
    use trace_dependency_diagram::render_with_options;

    use crate::{DiagramRenderOptions, build_render_options};

    #[test]
    fn renders_payload_for_a_single_call() {
        let spans = r#"[
            {"spanId": "1", "serviceName": "web", "kind": "CLIENT", "duration": 10},
            {"spanId": "1", "serviceName": "api", "kind": "SERVER", "duration": 30}
        ]"#;

        let json = render_with_options(spans, build_render_options(DiagramRenderOptions::default()))
            .expect("single call should render");

        assert!(json.contains("\"graphType\": \"trace-dependency\""));
        assert!(json.contains("\"web\""));
        assert!(json.contains("\"api\""));
    }

    #[test]
    fn options_override_radius_bounds() {
        let options = build_render_options(DiagramRenderOptions {
            theme: Some("dark".to_string()),
            min_radius: Some(30.0),
            ..Default::default()
        });
        assert_eq!(options.config.diagram.min_radius, 30.0);
        assert_eq!(options.config.diagram.max_radius, 120.0);
    }
}
