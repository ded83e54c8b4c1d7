//! Lattice generators used to place reservoir neurons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{LiquidError, Position, Result};

/// Lattice topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    /// Simple cubic lattice
    Cubic,
    /// Hexagonal layers stacked along z
    HexagonalPrism,
}

impl FromStr for GridKind {
    type Err = LiquidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cubic" | "cube" => Ok(GridKind::Cubic),
            "hex" | "hexagonal" | "hexagonal_prism" | "hexagonal-prism" => {
                Ok(GridKind::HexagonalPrism)
            }
            other => Err(LiquidError::UnknownTopology(other.to_string())),
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridKind::Cubic => write!(f, "cubic"),
            GridKind::HexagonalPrism => write!(f, "hex"),
        }
    }
}

/// Generate every lattice point of a `dims[0] x dims[1] x dims[2]` grid.
///
/// Points are unique by construction. The hexagonal prism shifts odd rows by
/// half a spacing and packs rows at `spacing * sqrt(3) / 2`.
pub fn generate_grid(kind: GridKind, dims: [usize; 3], spacing: f64) -> Vec<Position> {
    let [nx, ny, nz] = dims;
    let mut points = Vec::with_capacity(nx * ny * nz);

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let point = match kind {
                    GridKind::Cubic => Position::new(
                        i as f64 * spacing,
                        j as f64 * spacing,
                        k as f64 * spacing,
                    ),
                    GridKind::HexagonalPrism => {
                        let offset = if j % 2 == 1 { 0.5 } else { 0.0 };
                        Position::new(
                            (i as f64 + offset) * spacing,
                            j as f64 * spacing * 3f64.sqrt() / 2.0,
                            k as f64 * spacing,
                        )
                    }
                };
                points.push(point);
            }
        }
    }

    points
}

/// Smallest near-cubic lattice holding at least `n` points.
pub fn grid_for(kind: GridKind, n: usize, spacing: f64) -> Result<Vec<Position>> {
    if spacing <= 0.0 || !spacing.is_finite() {
        return Err(LiquidError::InvalidParameter(format!(
            "grid spacing must be positive, got {}",
            spacing
        )));
    }

    let mut side = 1;
    while side * side * side < n {
        side += 1;
    }

    Ok(generate_grid(kind, [side, side, side], spacing))
}
