use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::DEFAULT_EPSILON;
use crate::edges::{nearest_edge, predict_edge};
use crate::error::Result;

use super::context::PipelineContext;

/// User-facing settings of an elemental-mapping run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Exit condition of the Newton-Raphson iteration for `r`.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Edge energy loss in eV. Predicted from the stack when absent.
    #[serde(default)]
    pub edge_energy_loss: Option<f32>,
    /// Worker slots. Defaults to the number of available cores.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            edge_energy_loss: None,
            workers: None,
        }
    }
}

impl MapConfig {
    /// Edge threshold for a stack with the given energy losses: the configured
    /// value, else the ionisation edge predicted between the two highest
    /// energy losses.
    pub fn resolve_edge(&self, energy_losses: &[f32]) -> Option<f32> {
        if let Some(edge) = self.edge_energy_loss {
            return Some(edge);
        }
        let edge = predict_edge(energy_losses)?;
        let (_, label) = nearest_edge(edge);
        info!(edge_energy_loss = edge, element = label, "Predicted ionisation edge");
        Some(edge)
    }

    pub fn context(&self) -> Result<PipelineContext> {
        match self.workers {
            Some(n) => PipelineContext::with_workers(n),
            None => PipelineContext::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_edge_wins() {
        let config = MapConfig {
            edge_energy_loss: Some(300.0),
            ..MapConfig::default()
        };
        assert_eq!(config.resolve_edge(&[200.0, 250.0, 350.0]), Some(300.0));
    }

    #[test]
    fn test_predicted_edge() {
        let config = MapConfig::default();
        assert_eq!(config.resolve_edge(&[200.0, 300.0, 250.0]), Some(284.0));
        assert_eq!(config.resolve_edge(&[200.0]), None);
    }
}
