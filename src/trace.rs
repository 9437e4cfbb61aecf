use crate::error::TraceError;
use crate::span::{Span, SpanKind};
use std::collections::HashMap;

/// Spans of one request arranged by their call relationships.
///
/// Spans live in an arena; tree links are indices into it.
#[derive(Debug, Clone)]
pub struct TraceTree {
    spans: Vec<Span>,
    children: Vec<Vec<usize>>,
    root: usize,
}

/// Builds the tree for a trace, returning `None` when there are no spans.
pub fn get_tree_root(spans: Vec<Span>) -> Result<Option<TraceTree>, TraceError> {
    TraceTree::from_spans(spans)
}

impl TraceTree {
    pub fn from_spans(spans: Vec<Span>) -> Result<Option<Self>, TraceError> {
        if spans.is_empty() {
            return Ok(None);
        }

        let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, span) in spans.iter().enumerate() {
            by_id.entry(span.span_id.as_str()).or_default().push(idx);
        }

        let parents: Vec<Option<usize>> = (0..spans.len())
            .map(|idx| resolve_parent(&spans, &by_id, idx))
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
        let mut roots = Vec::new();
        for (idx, parent) in parents.iter().enumerate() {
            match parent {
                Some(parent) => children[*parent].push(idx),
                None => roots.push(idx),
            }
        }

        if roots.len() > 1 {
            return Err(TraceError::MultipleRoots { count: roots.len() });
        }
        let Some(&root) = roots.first() else {
            return Err(TraceError::Cycle {
                span_id: spans[0].span_id.clone(),
            });
        };

        for list in &mut children {
            list.sort_by_key(|&idx| spans[idx].start_time);
        }

        let mut reached = vec![false; spans.len()];
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            reached[idx] = true;
            stack.extend(children[idx].iter().copied());
        }
        if let Some(orphan) = reached.iter().position(|seen| !seen) {
            return Err(TraceError::Cycle {
                span_id: spans[orphan].span_id.clone(),
            });
        }

        tracing::debug!(spans = spans.len(), root = %spans[root].span_id, "built trace tree");
        Ok(Some(Self {
            spans,
            children,
            root,
        }))
    }

    pub fn root(&self) -> &Span {
        &self.spans[self.root]
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Direct children of the span that `parentId == span_id` resolves to,
    /// ordered by start time. For an RPC pair that is the server half.
    pub fn children(&self, span_id: &str) -> Vec<&Span> {
        let candidates: Vec<usize> = (0..self.spans.len())
            .filter(|&idx| self.spans[idx].span_id == span_id)
            .collect();
        pick_parent(&self.spans, &candidates)
            .map(|idx| self.children[idx].iter().map(|&c| &self.spans[c]).collect())
            .unwrap_or_default()
    }

    /// Pre-order walk. Each span's callback gets the value returned for its
    /// parent (the root gets `initial`) and returns the value for its children.
    pub fn walk<'a, T, F>(&'a self, mut callback: F, initial: T)
    where
        T: Clone,
        F: FnMut(&'a Span, T) -> T,
    {
        let mut stack = vec![(self.root, initial)];
        while let Some((idx, data)) = stack.pop() {
            let next = callback(&self.spans[idx], data);
            for &child in self.children[idx].iter().rev() {
                stack.push((child, next.clone()));
            }
        }
    }
}

fn resolve_parent(spans: &[Span], by_id: &HashMap<&str, Vec<usize>>, idx: usize) -> Option<usize> {
    let span = &spans[idx];
    let same_trace = |other: usize| other != idx && spans[other].trace_id == span.trace_id;

    // Client and server halves of one RPC share a span id.
    if span.kind == SpanKind::Server
        && let Some(client) = by_id.get(span.span_id.as_str()).and_then(|ids| {
            ids.iter()
                .copied()
                .find(|&other| same_trace(other) && spans[other].kind == SpanKind::Client)
        })
    {
        return Some(client);
    }

    let parent_id = span.parent_id.as_deref().filter(|id| !id.is_empty())?;
    if parent_id == span.span_id {
        return None;
    }
    let candidates: Vec<usize> = by_id
        .get(parent_id)?
        .iter()
        .copied()
        .filter(|&other| same_trace(other))
        .collect();
    pick_parent(spans, &candidates)
}

// The server half of a shared-id pair owns the spans below that id.
fn pick_parent(spans: &[Span], candidates: &[usize]) -> Option<usize> {
    candidates
        .iter()
        .copied()
        .find(|&idx| spans[idx].kind == SpanKind::Server)
        .or_else(|| candidates.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, parent: Option<&str>, service: &str, kind: SpanKind, start: u64) -> Span {
        let mut span = Span::new(id, service, kind);
        span.parent_id = parent.map(str::to_string);
        span.start_time = start;
        span
    }

    #[test]
    fn empty_trace_has_no_tree() {
        assert!(TraceTree::from_spans(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn shared_span_id_pairs_server_under_client() {
        let spans = vec![
            span("1", None, "gateway", SpanKind::Server, 0),
            span("2", Some("1"), "gateway", SpanKind::Client, 1),
            span("2", Some("1"), "orders", SpanKind::Server, 2),
            span("3", Some("2"), "orders", SpanKind::Client, 3),
        ];
        let tree = TraceTree::from_spans(spans).unwrap().unwrap();
        assert_eq!(tree.root().service_name, "gateway");

        let mut order = Vec::new();
        tree.walk(
            |span, depth: usize| {
                order.push((span.service_name.clone(), span.kind, depth));
                depth + 1
            },
            0,
        );
        assert_eq!(
            order,
            vec![
                ("gateway".to_string(), SpanKind::Server, 0),
                ("gateway".to_string(), SpanKind::Client, 1),
                ("orders".to_string(), SpanKind::Server, 2),
                ("orders".to_string(), SpanKind::Client, 3),
            ]
        );
    }

    #[test]
    fn children_ordered_by_start_time() {
        let spans = vec![
            span("r", None, "root", SpanKind::Server, 0),
            span("b", Some("r"), "late", SpanKind::Client, 20),
            span("a", Some("r"), "early", SpanKind::Client, 5),
        ];
        let tree = TraceTree::from_spans(spans).unwrap().unwrap();
        let names: Vec<&str> = tree
            .children("r")
            .iter()
            .map(|s| s.service_name.as_str())
            .collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn children_of_rpc_pair_hang_off_server_half() {
        let spans = vec![
            span("r", None, "gateway", SpanKind::Server, 0),
            span("c", Some("r"), "gateway", SpanKind::Client, 1),
            span("c", Some("r"), "employee", SpanKind::Server, 2),
            span("d", Some("c"), "employee", SpanKind::Client, 3),
        ];
        let tree = TraceTree::from_spans(spans).unwrap().unwrap();
        let below: Vec<(&str, &str)> = tree
            .children("c")
            .iter()
            .map(|s| (s.span_id.as_str(), s.service_name.as_str()))
            .collect();
        assert_eq!(below, vec![("d", "employee")]);
        assert!(tree.children("missing").is_empty());
    }

    #[test]
    fn equal_start_times_keep_input_order() {
        let spans = vec![
            span("r", None, "root", SpanKind::Server, 0),
            span("x", Some("r"), "first", SpanKind::Client, 7),
            span("y", Some("r"), "second", SpanKind::Client, 7),
            span("z", Some("r"), "third", SpanKind::Client, 7),
        ];
        let tree = TraceTree::from_spans(spans).unwrap().unwrap();
        let names: Vec<&str> = tree
            .children("r")
            .iter()
            .map(|s| s.service_name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn trace_without_root_is_a_cycle() {
        let spans = vec![
            span("a", Some("b"), "a", SpanKind::Server, 0),
            span("b", Some("a"), "b", SpanKind::Server, 0),
        ];
        assert_eq!(
            TraceTree::from_spans(spans).unwrap_err(),
            TraceError::Cycle {
                span_id: "a".to_string()
            }
        );
    }

    #[test]
    fn multiple_roots_rejected() {
        let spans = vec![
            span("a", None, "one", SpanKind::Server, 0),
            span("b", Some("missing"), "two", SpanKind::Server, 0),
        ];
        assert_eq!(
            TraceTree::from_spans(spans).unwrap_err(),
            TraceError::MultipleRoots { count: 2 }
        );
    }

    #[test]
    fn cycles_rejected() {
        let spans = vec![
            span("r", None, "root", SpanKind::Server, 0),
            span("a", Some("b"), "a", SpanKind::Server, 0),
            span("b", Some("a"), "b", SpanKind::Server, 0),
        ];
        assert!(matches!(
            TraceTree::from_spans(spans),
            Err(TraceError::Cycle { .. })
        ));
    }

    #[test]
    fn walk_passes_parent_value_to_every_child() {
        let spans = vec![
            span("r", None, "root", SpanKind::Server, 0),
            span("a", Some("r"), "a", SpanKind::Client, 1),
            span("b", Some("r"), "b", SpanKind::Client, 2),
        ];
        let tree = TraceTree::from_spans(spans).unwrap().unwrap();
        let mut seen = Vec::new();
        tree.walk(
            |span, parent: Option<String>| {
                seen.push((span.span_id.clone(), parent));
                Some(span.span_id.clone())
            },
            None,
        );
        assert_eq!(seen[1], ("a".to_string(), Some("r".to_string())));
        assert_eq!(seen[2], ("b".to_string(), Some("r".to_string())));
    }
}
