//! The subgraph selection tool.
//!
//! A tap is hit-tested against the glyphs of every renderer that draws
//! the vertex source. All hits become roots of one traversal, and the
//! closure replaces the vertex selection. A tap that hits nothing leaves
//! the selection alone.

use crate::error::ToolError;
use coda_graph::{GraphIndex, TraversalMode, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Data source name of the vertex table.
pub const VERTEX_SOURCE: &str = "vertices";

/// Data source name of the edge table.
pub const EDGE_SOURCE: &str = "edges";

/// Glyph radius used when a client does not send one.
pub const DEFAULT_HIT_RADIUS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Resolves a point to the rows of `source` drawn there.
pub trait HitTest {
    fn hit_test(&self, point: Point, source: &str) -> Vec<usize>;
}

/// One drawn row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub row: usize,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    DEFAULT_HIT_RADIUS
}

/// Glyph positions of one plot renderer as last reported by its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderer {
    pub id: String,
    pub source: String,
    pub glyphs: Vec<Glyph>,
}

/// Server-side mirror of the client plots, used for hit-testing.
#[derive(Debug, Clone, Default)]
pub struct PlotSurface {
    renderers: HashMap<String, Renderer>,
}

impl PlotSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a renderer by id.
    pub fn update(&mut self, renderer: Renderer) {
        self.renderers.insert(renderer.id.clone(), renderer);
    }

    pub fn remove(&mut self, id: &str) -> Option<Renderer> {
        self.renderers.remove(id)
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    /// Drops glyphs of rows at or past `row_count`. Called after a reload
    /// shrank the source.
    pub fn truncate_source(&mut self, source: &str, row_count: usize) {
        for renderer in self.renderers.values_mut().filter(|r| r.source == source) {
            renderer.glyphs.retain(|g| g.row < row_count);
        }
    }
}

impl HitTest for PlotSurface {
    fn hit_test(&self, point: Point, source: &str) -> Vec<usize> {
        let rows: BTreeSet<usize> = self
            .renderers
            .values()
            .filter(|r| r.source == source)
            .flat_map(|r| r.glyphs.iter())
            .filter(|g| {
                let (dx, dy) = (g.x - point.x, g.y - point.y);
                (dx * dx + dy * dy).sqrt() <= g.radius
            })
            .map(|g| g.row)
            .collect();
        rows.into_iter().collect()
    }
}

/// Turns taps or explicit roots into a vertex selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphTool {
    pub mode: TraversalMode,
    pub vertex_source: String,
}

impl Default for SubgraphTool {
    fn default() -> Self {
        Self::new(TraversalMode::default())
    }
}

impl SubgraphTool {
    pub fn new(mode: TraversalMode) -> Self {
        Self {
            mode,
            vertex_source: VERTEX_SOURCE.to_string(),
        }
    }

    /// Handles a tap. Returns `None` when nothing was hit.
    pub fn tap<H: HitTest>(
        &self,
        surface: &H,
        graph: &GraphIndex,
        point: Point,
        mode: Option<TraversalMode>,
    ) -> Result<Option<Vec<VertexId>>, ToolError> {
        let roots = surface.hit_test(point, &self.vertex_source);
        if roots.is_empty() {
            return Ok(None);
        }
        self.select(graph, &roots, mode).map(Some)
    }

    /// Computes the closure of roots chosen without hit-testing.
    pub fn select(
        &self,
        graph: &GraphIndex,
        roots: &[VertexId],
        mode: Option<TraversalMode>,
    ) -> Result<Vec<VertexId>, ToolError> {
        Ok(graph.closure(roots, mode.unwrap_or(self.mode))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coda_graph::GraphError;

    fn colony() -> GraphIndex {
        GraphIndex::build(6, &[(0, 1), (1, 2), (1, 3), (4, 5)]).unwrap()
    }

    fn scatter() -> Renderer {
        Renderer {
            id: "scatter".into(),
            source: VERTEX_SOURCE.into(),
            glyphs: vec![
                Glyph { row: 0, x: 0.0, y: 0.0, radius: 1.0 },
                Glyph { row: 4, x: 1.5, y: 0.0, radius: 1.0 },
                Glyph { row: 2, x: 10.0, y: 10.0, radius: 1.0 },
            ],
        }
    }

    #[test]
    fn test_hit_test_filters_by_source() {
        let mut surface = PlotSurface::new();
        surface.update(scatter());
        surface.update(Renderer {
            id: "edge-lines".into(),
            source: EDGE_SOURCE.into(),
            glyphs: vec![Glyph { row: 3, x: 0.0, y: 0.0, radius: 5.0 }],
        });

        assert_eq!(surface.hit_test(Point::new(0.1, 0.0), VERTEX_SOURCE), vec![0]);
        assert_eq!(surface.hit_test(Point::new(0.1, 0.0), EDGE_SOURCE), vec![3]);
        assert!(surface.hit_test(Point::new(50.0, 0.0), VERTEX_SOURCE).is_empty());
    }

    #[test]
    fn test_overlapping_glyphs_are_all_roots() {
        let mut surface = PlotSurface::new();
        surface.update(scatter());
        let tool = SubgraphTool::default();

        // Between the glyphs of rows 0 and 4, within reach of both.
        let selected = tool
            .tap(&surface, &colony(), Point::new(0.75, 0.0), None)
            .unwrap();
        assert_eq!(selected, Some(vec![0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_miss_returns_none() {
        let mut surface = PlotSurface::new();
        surface.update(scatter());
        let tool = SubgraphTool::default();

        assert_eq!(
            tool.tap(&surface, &colony(), Point::new(-20.0, 0.0), None)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_mode_override() {
        let tool = SubgraphTool::new(TraversalMode::Descendants);
        let graph = colony();

        assert_eq!(tool.select(&graph, &[3], None).unwrap(), vec![3]);
        assert_eq!(
            tool.select(&graph, &[3], Some(TraversalMode::Ancestors))
                .unwrap(),
            vec![0, 1, 3]
        );
    }

    #[test]
    fn test_stale_glyph_is_rejected() {
        let mut surface = PlotSurface::new();
        surface.update(Renderer {
            id: "map".into(),
            source: VERTEX_SOURCE.into(),
            glyphs: vec![Glyph { row: 9, x: 0.0, y: 0.0, radius: 1.0 }],
        });
        let tool = SubgraphTool::default();

        let err = tool
            .tap(&surface, &colony(), Point::new(0.0, 0.0), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Graph(GraphError::OutOfRange { vertex: 9, .. })
        ));

        surface.truncate_source(VERTEX_SOURCE, 6);
        assert_eq!(
            tool.tap(&surface, &colony(), Point::new(0.0, 0.0), None)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_glyph_radius_defaults() {
        let glyph: Glyph = serde_json::from_str(r#"{"row": 1, "x": 2.0, "y": 3.0}"#).unwrap();
        assert_eq!(glyph.radius, DEFAULT_HIT_RADIUS);
    }
}
