use crate::color::{ColorGenerator, shade_color};
use crate::config::DiagramConfig;
use crate::error::{DiagramError, Result};
use crate::graph::{DependencyGraph, DurationRange};
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

const DATA_URI_PREFIX: &str = "data:image/svg+xml;charset=utf-8,";
// Keeps the outline stroke inside the viewBox.
const RING_INSET: f32 = 3.0;
const ERROR_BADGE_RING: &str = "M120.5,9.6C59.1,9.6,9,59.8,9,121.3S59.1,233,120.5,233S232,182.8,232,121.3S181.9,9.6,120.5,9.6z";
const ERROR_BADGE_MARK: &str = "M105.4,164.5h29.9v29.9h-29.9V164.5z M105.4,44.2h29.9v90.1h-29.9V44.2z";

/// Radius for a node whose representative span took `duration`.
pub fn node_radius(duration: u64, range: DurationRange, config: &DiagramConfig) -> f32 {
    if range.max == range.min {
        return config.max_radius;
    }
    let spread = (range.max - range.min) as f64;
    let offset = duration.saturating_sub(range.min).min(range.max - range.min) as f64;
    let radius = offset * (config.max_radius - config.min_radius) as f64 / spread;
    radius as f32 + config.min_radius
}

#[derive(Debug, Clone, Copy)]
struct NodeVisual {
    radius: f32,
    has_error: bool,
}

/// Produces the icon the graph widget draws for each node.
///
/// Radii are fixed when the generator is built; colors are looked up on
/// every call so opacity can vary per call.
#[derive(Debug, Clone)]
pub struct NodeViewGenerator {
    colors: Arc<ColorGenerator>,
    visuals: HashMap<String, NodeVisual>,
    config: DiagramConfig,
}

impl NodeViewGenerator {
    pub fn new(graph: &DependencyGraph, colors: Arc<ColorGenerator>, config: &DiagramConfig) -> Self {
        let range = graph.duration_range();
        let visuals = graph
            .nodes
            .iter()
            .map(|node| {
                let radius = range
                    .map(|range| node_radius(node.span.duration, range, config))
                    .unwrap_or(config.max_radius);
                let visual = NodeVisual {
                    radius,
                    has_error: node.span.has_error(),
                };
                (node.id.clone(), visual)
            })
            .collect();
        Self {
            colors,
            visuals,
            config: config.clone(),
        }
    }

    pub fn radius(&self, node_id: &str) -> Option<f32> {
        self.visuals.get(node_id).map(|visual| visual.radius)
    }

    /// Icon for `node_id` as a `data:` URI, with colors shaded by `opacity`.
    pub fn view(&self, node_id: &str, opacity: f32) -> Result<String> {
        let svg = self.svg(node_id, opacity)?;
        Ok(format!("{DATA_URI_PREFIX}{}", urlencoding::encode(&svg)))
    }

    pub fn svg(&self, node_id: &str, opacity: f32) -> Result<String> {
        let visual = self
            .visuals
            .get(node_id)
            .ok_or_else(|| DiagramError::UnknownNode(node_id.to_string()))?;

        let color_key = if node_id == self.config.global_gateway {
            ColorGenerator::SYSTEM
        } else {
            node_id.split(':').next().unwrap_or(node_id)
        };
        let color = shade_color(&self.colors.get_color(color_key), opacity);
        let outline_color = shade_color(&color, self.config.outline_shade);

        let size = self.config.icon_size;
        let center = size / 2.0;
        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" x=\"0px\" y=\"0px\" width=\"{size}px\" height=\"{size}px\" viewBox=\"0 0 {size} {size}\" style=\"enable-background:new 0 0 {size} {size}\" xml:space=\"preserve\">"
        ));
        let circle = format!(
            "<circle cx=\"{center}\" cy=\"{center}\" r=\"{:.2}\" fill=\"{color}\" stroke=\"{outline_color}\" stroke-width=\"{}\"/>",
            (visual.radius - RING_INSET).max(0.0),
            self.config.outline_width
        );

        if visual.has_error {
            let error_color = shade_color(&self.colors.get_color(ColorGenerator::ERROR), opacity);
            // Badge sits on the circle's upper-right edge.
            let badge_x = self.config.error_badge_x;
            let badge_y = center - visual.radius * (PI / 4.0) - self.config.error_badge_gap;
            let scale = self.config.error_badge_scale;
            svg.push_str(&format!("<g><g><g>{circle}</g></g>"));
            svg.push_str(&format!(
                "<g transform=\"translate({badge_x:.2},{badge_y:.2}) scale({scale}, {scale})\">"
            ));
            svg.push_str(&format!(
                "<path stroke=\"#fff\" stroke-width=\"10\" fill=\"{error_color}\" d=\"{ERROR_BADGE_RING}\"/>"
            ));
            svg.push_str(&format!("<path fill=\"#ffffff\" d=\"{ERROR_BADGE_MARK}\"/></g></g>"));
        } else {
            svg.push_str(&circle);
        }
        svg.push_str("</svg>");
        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Cell, Span, SpanKind};
    use crate::system::SystemSpanFilter;
    use crate::trace::TraceTree;
    use serde_json::json;

    fn range(min: u64, max: u64) -> DurationRange {
        DurationRange { min, max }
    }

    #[test]
    fn radius_interpolates_between_bounds() {
        let config = DiagramConfig::default();
        assert_eq!(node_radius(100, range(100, 300), &config), 60.0);
        assert_eq!(node_radius(300, range(100, 300), &config), 120.0);
        assert_eq!(node_radius(200, range(100, 300), &config), 90.0);
    }

    #[test]
    fn equal_durations_use_max_radius() {
        let config = DiagramConfig::default();
        assert_eq!(node_radius(42, range(42, 42), &config), 120.0);
    }

    fn generator(error: bool) -> NodeViewGenerator {
        let mut client = Span::new("1", "gateway", SpanKind::Client);
        client.cell = Some(Cell {
            name: "hr".to_string(),
        });
        client.duration = 1000;
        let mut server = Span::new("1", "employee", SpanKind::Server);
        server.cell = Some(Cell {
            name: "hr".to_string(),
        });
        server.duration = 500;
        if error {
            server.tags.insert("error".into(), json!(true));
        }
        let tree = TraceTree::from_spans(vec![client, server]).unwrap().unwrap();
        let colors = Arc::new(ColorGenerator::default());
        let config = DiagramConfig::default();
        let graph = DependencyGraph::build(&tree, &colors, &SystemSpanFilter::default(), &config);
        NodeViewGenerator::new(&graph, colors, &config)
    }

    #[test]
    fn plain_node_is_a_single_circle() {
        let views = generator(false);
        assert_eq!(views.radius("hr:gateway"), Some(120.0));
        assert_eq!(views.radius("hr:employee"), Some(60.0));
        let svg = views.svg("hr:gateway", 0.0).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("r=\"117.00\""));
        assert!(svg.contains("stroke-width=\"5\""));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn cell_nodes_share_the_cell_color() {
        let views = generator(false);
        let colors = ColorGenerator::default();
        let hr = colors.get_color("hr");
        let svg = views.svg("hr:employee", 0.0).unwrap();
        assert!(svg.contains(&format!("fill=\"{}\"", hr.to_ascii_lowercase())));
        assert!(svg.contains(&format!("stroke=\"{}\"", shade_color(&hr, -0.08))));
    }

    #[test]
    fn error_node_carries_badge() {
        let views = generator(true);
        let svg = views.svg("hr:employee", 0.0).unwrap();
        assert!(svg.contains("scale(0.35, 0.35)"));
        assert!(svg.contains(ERROR_BADGE_MARK));
        // 120 - 60 * pi / 4 - 30
        assert!(svg.contains("translate(150.00,42.88)"));
        let healthy = views.svg("hr:gateway", 0.0).unwrap();
        assert!(!healthy.contains(ERROR_BADGE_MARK));
    }

    #[test]
    fn view_is_an_encoded_data_uri() {
        let views = generator(false);
        let uri = views.view("hr:gateway", 0.2).unwrap();
        assert!(uri.starts_with(DATA_URI_PREFIX));
        let encoded = &uri[DATA_URI_PREFIX.len()..];
        assert!(!encoded.contains('<'));
        let decoded = urlencoding::decode(encoded).unwrap();
        assert!(decoded.contains("<circle"));
    }

    #[test]
    fn unknown_node_is_an_error() {
        let views = generator(false);
        assert!(matches!(views.view("nope", 0.0), Err(DiagramError::UnknownNode(_))));
    }

    #[test]
    fn global_gateway_uses_system_color() {
        let client = Span::new("1", "global-gateway", SpanKind::Client);
        let server = Span::new("1", "backend", SpanKind::Server);
        let tree = TraceTree::from_spans(vec![client, server]).unwrap().unwrap();
        let colors = Arc::new(ColorGenerator::default());
        let config = DiagramConfig::default();
        let graph = DependencyGraph::build(&tree, &colors, &SystemSpanFilter::default(), &config);
        let views = NodeViewGenerator::new(&graph, colors.clone(), &config);
        let svg = views.svg("global-gateway", 0.0).unwrap();
        let system = shade_color(&colors.get_color(ColorGenerator::SYSTEM), 0.0);
        assert!(svg.contains(&format!("fill=\"{system}\"")));
    }
}
