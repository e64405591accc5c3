//! Parameter grid for exhaustive sweeps
//!
//! Enumeration order is a visible contract: clip limits form the outer
//! loop and tile sizes the inner loop, both in their given order. Trial
//! ids are assigned from this order, so it must be stable and restartable.

use crate::models::ParameterPoint;

/// The two-dimensional search space of the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    /// Clip limit (alpha) candidates, tested in order
    pub clip_limits: Vec<f64>,
    /// Tile size (omega) candidates, tested in order
    pub tile_sizes: Vec<u32>,
}

impl Default for ParameterGrid {
    /// The reference experiment: alpha 1.0 to 5.0 in steps of 0.5,
    /// tile sizes 8, 16 and 32
    fn default() -> Self {
        Self {
            clip_limits: (0..9).map(|i| 1.0 + 0.5 * i as f64).collect(),
            tile_sizes: vec![8, 16, 32],
        }
    }
}

impl ParameterGrid {
    pub fn new(clip_limits: Vec<f64>, tile_sizes: Vec<u32>) -> Self {
        Self {
            clip_limits,
            tile_sizes,
        }
    }

    /// Number of points in the grid
    pub fn len(&self) -> usize {
        self.clip_limits.len() * self.tile_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate the Cartesian product, alpha outer / omega inner.
    /// Re-iterating yields the identical sequence.
    pub fn points(&self) -> impl Iterator<Item = ParameterPoint> + '_ {
        self.clip_limits.iter().flat_map(move |&clip_limit| {
            self.tile_sizes.iter().map(move |&tile_size| ParameterPoint {
                clip_limit,
                tile_size,
            })
        })
    }
}
