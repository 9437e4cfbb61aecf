#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod graph;
pub mod icon;
pub mod legend;
pub mod render;
pub mod span;
pub mod system;
pub mod text_metrics;
pub mod theme;
pub mod trace;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use color::{ColorGenerator, shade_color};
pub use config::{Config, DiagramConfig, load_config, parse_config};
pub use error::{DiagramError, Result, TraceError};
pub use graph::{DependencyGraph, GraphLink, GraphNode, node_id};
pub use icon::{NodeViewGenerator, node_radius};
pub use legend::{Legend, LegendState};
pub use render::{DiagramPayload, RenderOptions, render_with_options};
pub use span::{Span, SpanKind, parse_spans};
pub use theme::Theme;
pub use trace::{TraceTree, get_tree_root};
pub use view::{DependencyDiagram, DiagramView};
