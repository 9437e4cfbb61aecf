use crate::color::ColorGenerator;
use crate::config::DiagramConfig;
use crate::span::{Span, SpanKind};
use crate::system::SystemSpanFilter;
use crate::trace::TraceTree;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub color: String,
    pub size: u32,
    /// First span seen for this service; drives radius and error state.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    index: HashMap<String, usize>,
}

/// `cell:service` for spans inside a cell, plain `service` otherwise.
pub fn node_id(span: &Span) -> String {
    match span.cell_name() {
        Some(cell) => format!("{cell}:{}", span.service_name),
        None => span.service_name.clone(),
    }
}

pub fn node_color_key(span: &Span) -> String {
    if let Some(cell) = span.cell_name() {
        return cell.to_string();
    }
    if span.is_system_component() {
        return ColorGenerator::SYSTEM.to_string();
    }
    match &span.component_type {
        Some(component) => component.as_str().to_string(),
        None => ColorGenerator::UNKNOWN.to_string(),
    }
}

impl DependencyGraph {
    /// Derives service nodes and call links from a span tree.
    ///
    /// A link opens at a client span and closes at the next server span
    /// below it; infrastructure spans are transparent to that search.
    pub fn build(
        tree: &TraceTree,
        colors: &ColorGenerator,
        filter: &SystemSpanFilter,
        config: &DiagramConfig,
    ) -> Self {
        let mut graph = Self::default();
        let mut skipped = 0usize;

        tree.walk(
            |span, pending| {
                if filter.is_ignored(span) {
                    skipped += 1;
                    return pending;
                }
                match (pending, span.kind) {
                    (Some(source), SpanKind::Server) => {
                        graph.add_node_if_not_present(span, colors, config);
                        graph.add_link(source, span, colors);
                        None
                    }
                    (None, SpanKind::Client) => {
                        graph.add_node_if_not_present(span, colors, config);
                        Some(span)
                    }
                    _ => pending,
                }
            },
            None::<&Span>,
        );

        tracing::debug!(
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            skipped,
            "built dependency graph"
        );
        graph
    }

    fn add_node_if_not_present(&mut self, span: &Span, colors: &ColorGenerator, config: &DiagramConfig) {
        let id = node_id(span);
        if self.index.contains_key(&id) {
            return;
        }
        let color = colors.get_color(&node_color_key(span));
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(GraphNode {
            id,
            color,
            size: config.node_size,
            span: span.clone(),
        });
    }

    fn add_link(&mut self, source: &Span, target: &Span, colors: &ColorGenerator) {
        let color = (source.has_error() || target.has_error())
            .then(|| colors.get_color(ColorGenerator::ERROR));
        self.links.push(GraphLink {
            source: node_id(source),
            target: node_id(target),
            color,
        });
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn duration_range(&self) -> Option<DurationRange> {
        let min = self.nodes.iter().map(|node| node.span.duration).min()?;
        let max = self.nodes.iter().map(|node| node.span.duration).max()?;
        Some(DurationRange { min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Cell, ComponentType};
    use serde_json::json;

    fn span(id: &str, parent: Option<&str>, service: &str, kind: SpanKind, cell: Option<&str>) -> Span {
        let mut span = Span::new(id, service, kind);
        span.parent_id = parent.map(str::to_string);
        span.cell = cell.map(|name| Cell {
            name: name.to_string(),
        });
        span.component_type = Some(ComponentType::Component);
        span
    }

    fn build(spans: Vec<Span>) -> DependencyGraph {
        let tree = TraceTree::from_spans(spans).unwrap().unwrap();
        DependencyGraph::build(
            &tree,
            &ColorGenerator::default(),
            &SystemSpanFilter::default(),
            &DiagramConfig::default(),
        )
    }

    #[test]
    fn node_ids_include_cell() {
        assert_eq!(node_id(&span("a", None, "gateway", SpanKind::Client, Some("hr"))), "hr:gateway");
        assert_eq!(node_id(&span("a", None, "gateway", SpanKind::Client, None)), "gateway");
    }

    #[test]
    fn color_keys() {
        assert_eq!(node_color_key(&span("a", None, "x", SpanKind::Client, Some("hr"))), "hr");
        let mut system = span("a", None, "x", SpanKind::Client, None);
        system.component_type = Some(ComponentType::System);
        assert_eq!(node_color_key(&system), ColorGenerator::SYSTEM);
        let mut bare = span("a", None, "x", SpanKind::Client, None);
        bare.component_type = None;
        assert_eq!(node_color_key(&bare), ColorGenerator::UNKNOWN);
    }

    #[test]
    fn client_server_pairs_become_links() {
        let graph = build(vec![
            span("1", None, "gateway", SpanKind::Client, Some("hr")),
            span("1", None, "employee", SpanKind::Server, Some("hr")),
            span("2", Some("1"), "employee", SpanKind::Client, Some("hr")),
            span("2", Some("1"), "salary", SpanKind::Server, Some("stock")),
        ]);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["hr:gateway", "hr:employee", "stock:salary"]);
        assert_eq!(graph.links.len(), 2);
        assert_eq!(graph.links[0].source, "hr:gateway");
        assert_eq!(graph.links[0].target, "hr:employee");
        assert_eq!(graph.links[1].source, "hr:employee");
        assert_eq!(graph.links[1].target, "stock:salary");
        assert!(graph.links.iter().all(|link| link.color.is_none()));
        assert_eq!(graph.nodes[0].size, 350);
    }

    #[test]
    fn intermediate_spans_keep_link_open() {
        let graph = build(vec![
            span("1", None, "gateway", SpanKind::Client, None),
            span("2", Some("1"), "proxy", SpanKind::Unknown, None),
            span("3", Some("2"), "backend", SpanKind::Server, None),
        ]);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].source, "gateway");
        assert_eq!(graph.links[0].target, "backend");
        assert!(graph.node("proxy").is_none());
    }

    #[test]
    fn system_spans_are_transparent() {
        let mut mixer = span("2", Some("1"), "istio-mixer", SpanKind::Server, None);
        mixer.component_type = Some(ComponentType::System);
        let graph = build(vec![
            span("1", None, "gateway", SpanKind::Client, None),
            mixer,
            span("3", Some("2"), "backend", SpanKind::Server, None),
        ]);
        assert!(graph.node("istio-mixer").is_none());
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].target, "backend");
    }

    #[test]
    fn nodes_deduplicated_links_not() {
        let graph = build(vec![
            span("r", None, "root", SpanKind::Server, None),
            span("1", Some("r"), "gateway", SpanKind::Client, None),
            span("1", Some("r"), "backend", SpanKind::Server, None),
            span("2", Some("r"), "gateway", SpanKind::Client, None),
            span("2", Some("r"), "backend", SpanKind::Server, None),
        ]);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn error_links_are_colored() {
        let mut failing = span("1", None, "backend", SpanKind::Server, None);
        failing.tags.insert("error".into(), json!(true));
        let graph = build(vec![span("1", None, "gateway", SpanKind::Client, None), failing]);
        let colors = ColorGenerator::default();
        assert_eq!(
            graph.links[0].color.as_deref(),
            Some(colors.get_color(ColorGenerator::ERROR).as_str())
        );
    }

    #[test]
    fn server_without_open_link_adds_nothing() {
        let graph = build(vec![span("1", None, "backend", SpanKind::Server, None)]);
        assert!(graph.is_empty());
        assert!(graph.duration_range().is_none());
    }

    #[test]
    fn duration_range_uses_representative_spans() {
        let mut client = span("1", None, "gateway", SpanKind::Client, None);
        client.duration = 900;
        let mut server = span("1", None, "backend", SpanKind::Server, None);
        server.duration = 300;
        let graph = build(vec![client, server]);
        assert_eq!(graph.duration_range(), Some(DurationRange { min: 300, max: 900 }));
    }
}
