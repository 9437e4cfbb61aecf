use crate::color::ColorGenerator;
use crate::config::Config;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::icon::NodeViewGenerator;
use crate::legend::{LEGEND_BUTTON_LABEL, LegendState};
use crate::render::DiagramPayload;
use crate::span::Span;
use crate::system::SystemSpanFilter;
use crate::trace::TraceTree;
use std::sync::Arc;

/// Dependency diagram for one trace, plus the legend toggle that survives
/// re-renders.
#[derive(Debug, Clone)]
pub struct DependencyDiagram {
    config: Config,
    filter: SystemSpanFilter,
    legend: LegendState,
}

/// Everything the graph widget needs to draw one trace.
#[derive(Debug, Clone)]
pub struct DiagramView {
    pub graph_id: String,
    pub graph_type: String,
    pub graph: DependencyGraph,
    pub views: NodeViewGenerator,
    pub legend: LegendState,
    pub legend_button: &'static str,
}

impl DependencyDiagram {
    pub fn new(config: Config) -> Result<Self> {
        let filter = SystemSpanFilter::new(&config.filter)?;
        Ok(Self {
            config,
            filter,
            legend: LegendState::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn legend(&self) -> &LegendState {
        &self.legend
    }

    pub fn handle_legend_click(&mut self, anchor: impl Into<String>) {
        self.legend.toggle(anchor);
    }

    /// Returns `None` when the trace yields no service nodes; nothing is drawn then.
    pub fn render(&self, spans: Vec<Span>, colors: &Arc<ColorGenerator>) -> Result<Option<DiagramView>> {
        let Some(tree) = TraceTree::from_spans(spans)? else {
            return Ok(None);
        };
        let graph = DependencyGraph::build(&tree, colors, &self.filter, &self.config.diagram);
        if graph.is_empty() {
            tracing::debug!(spans = tree.len(), "trace produced no dependency nodes");
            return Ok(None);
        }
        let views = NodeViewGenerator::new(&graph, Arc::clone(colors), &self.config.diagram);
        Ok(Some(DiagramView {
            graph_id: self.config.diagram.graph_id.clone(),
            graph_type: self.config.diagram.graph_type.clone(),
            graph,
            views,
            legend: self.legend.clone(),
            legend_button: LEGEND_BUTTON_LABEL,
        }))
    }
}

impl Default for DependencyDiagram {
    fn default() -> Self {
        Self {
            config: Config::default(),
            filter: SystemSpanFilter::default(),
            legend: LegendState::default(),
        }
    }
}

impl DiagramView {
    /// Node click handler: the span behind the clicked node.
    pub fn click_node(&self, node_id: &str) -> Option<&Span> {
        self.graph.node(node_id).map(|node| &node.span)
    }

    pub fn view(&self, node_id: &str, opacity: f32) -> Result<String> {
        self.views.view(node_id, opacity)
    }

    pub fn payload(&self, opacity: f32) -> Result<DiagramPayload> {
        DiagramPayload::from_view(self, opacity)
    }
}
