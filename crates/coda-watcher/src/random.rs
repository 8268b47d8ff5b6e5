//! Randomly generated colonies for development and demos.

use crate::error::ProviderError;
use crate::provider::DataProvider;
use coda_core::{Column, Dataset, EdgeId, Table, VertexId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::info;

const DEFAULT_SAMPLES: usize = 100;

// Scattered around a point in Berlin.
const LATITUDE: (f64, f64) = (52.521_154_4, 0.004);
const LONGITUDE: (f64, f64) = (13.346_980_7, 0.008);

/// Generates a fresh random vertex table and a random spanning tree on
/// every load.
pub struct RandomProvider {
    rng: StdRng,
    samples: usize,
}

impl RandomProvider {
    /// With a seed, the sequence of generated datasets is reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            samples: DEFAULT_SAMPLES,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    fn uniform(&mut self) -> Column {
        Column::Numeric((0..self.samples).map(|_| self.rng.gen::<f64>()).collect())
    }

    fn normal(&mut self, mean: f64, std: f64) -> Column {
        Column::Numeric(
            (0..self.samples)
                .map(|_| mean + std * standard_normal(&mut self.rng))
                .collect(),
        )
    }

    fn labels(&mut self, choices: &[&str]) -> Column {
        Column::Categorical(
            (0..self.samples)
                .map(|_| choices[self.rng.gen_range(0..choices.len())].to_string())
                .collect(),
        )
    }

    fn vertices(&mut self) -> Result<Table, ProviderError> {
        let columns = vec![
            ("input:col A".to_string(), self.uniform()),
            ("input:col B".to_string(), self.normal(0.0, 1.0)),
            ("input:col C".to_string(), self.uniform()),
            ("input:col D".to_string(), self.uniform()),
            ("input:col E".to_string(), self.uniform()),
            ("input:col F".to_string(), self.uniform()),
            ("input:label A".to_string(), self.labels(&["A1", "A2"])),
            ("input:label B".to_string(), self.labels(&["B1", "B2", "B3"])),
            ("input:latitude".to_string(), self.normal(LATITUDE.0, LATITUDE.1)),
            ("input:longitude".to_string(), self.normal(LONGITUDE.0, LONGITUDE.1)),
        ];
        Ok(Table::from_columns(columns)?)
    }

    /// Every vertex but the first gets one parent among the vertices
    /// before it, which yields a random tree.
    fn edges(&mut self) -> Result<Table, ProviderError> {
        let mut sources = Vec::with_capacity(self.samples.saturating_sub(1));
        let mut targets = Vec::with_capacity(self.samples.saturating_sub(1));

        for child in 1..self.samples {
            sources.push(self.rng.gen_range(0..child) as i64);
            targets.push(child as i64);
        }

        Ok(Table::from_columns(vec![
            ("source".to_string(), Column::Integer(sources)),
            ("target".to_string(), Column::Integer(targets)),
        ])?)
    }
}

impl DataProvider for RandomProvider {
    fn name(&self) -> &str {
        "random"
    }

    fn load(&mut self) -> Result<Dataset, ProviderError> {
        let vertices = self.vertices()?;
        let edges = self.edges()?;
        info!(
            "Generated random colony with {} vertices and {} edges",
            vertices.row_count(),
            edges.row_count()
        );
        Ok(Dataset::new(vertices, edges))
    }

    fn write_vertex_selection(&mut self, ids: &[VertexId]) -> Result<(), ProviderError> {
        info!("Vertex selection: {:?}", ids);
        Ok(())
    }

    fn write_edge_selection(&mut self, ids: &[EdgeId]) -> Result<(), ProviderError> {
        info!("Edge selection: {:?}", ids);
        Ok(())
    }
}

/// Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coda_core::ColumnKind;

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = RandomProvider::new(Some(7)).load().unwrap();
        let b = RandomProvider::new(Some(7)).load().unwrap();
        assert_eq!(a, b);

        let mut provider = RandomProvider::new(Some(7));
        let first = provider.load().unwrap();
        let second = provider.load().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_vertex_columns() {
        let dataset = RandomProvider::new(Some(1)).load().unwrap();
        let vertices = &dataset.vertices;

        assert_eq!(vertices.row_count(), DEFAULT_SAMPLES);
        assert_eq!(vertices.column_count(), 10);
        assert_eq!(
            vertices.column("input:label B").map(Column::kind),
            Some(ColumnKind::Categorical)
        );
        assert_eq!(vertices.scalar_columns().len(), 8);

        let latitude = vertices.column("input:latitude").unwrap();
        assert!((0..vertices.row_count())
            .filter_map(|row| latitude.as_f64(row))
            .all(|lat| (lat - LATITUDE.0).abs() < 1.0));
    }

    #[test]
    fn test_edges_form_a_tree() {
        let dataset = RandomProvider::new(Some(3)).with_samples(20).load().unwrap();
        assert_eq!(dataset.vertex_count(), 20);
        assert_eq!(dataset.edge_count(), 19);

        let sources = dataset.edges.column("source").unwrap();
        let targets = dataset.edges.column("target").unwrap();
        for edge in 0..dataset.edge_count() {
            let source = sources.as_f64(edge).unwrap();
            let target = targets.as_f64(edge).unwrap();
            assert!(source < target);
            assert_eq!(target, (edge + 1) as f64);
        }
    }

    #[test]
    fn test_single_sample_has_no_edges() {
        let dataset = RandomProvider::new(Some(3)).with_samples(1).load().unwrap();
        assert_eq!(dataset.vertex_count(), 1);
        assert_eq!(dataset.edge_count(), 0);
    }
}
