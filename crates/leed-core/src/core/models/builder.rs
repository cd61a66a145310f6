use super::atom::Atom;
use super::crystal::{Crystal, OpticalPotential, SurfaceModel};
use super::layer::{Lattice2, Layer};
use super::phase_shift::PhaseShiftSet;
use crate::core::constants::{GEO_TOLERANCE, MIN_LAYER_DISTANCE, POTENTIAL_STEP_HEIGHT};
use nalgebra::{Matrix2, Vector3};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayerBuildError {
    #[error("The bulk contains no atoms")]
    NoAtoms,
    #[error("Layers {lower} and {upper} overlap (z gap {gap:.4} Bohr)")]
    LayersOverlap { lower: String, upper: String, gap: f64 },
    #[error("Degenerate lattice: {0}")]
    DegenerateLattice(String),
    #[error("Found {0} bulk layers above the repeat period; at most one is allowed")]
    TooManyTerminalLayers(usize),
}

/// Assembles flat atom lists into the layered bulk and overlayer crystals.
///
/// Bulk atoms are folded into the 1×1 cell, sorted by height and split into
/// layers wherever the `z` gap exceeds [`MIN_LAYER_DISTANCE`]; closer atoms form
/// composite layers. Layers within one repeat period (`a3`) are periodic; one
/// more layer above the period may exist as the terminal bulk layer. Overlayer
/// atoms are split the same way on the superstructure lattice.
///
/// Every layer's origin sits at `(x, y)` of its lowest atom and at its lowest
/// `z`, so single-atom layers are centred on their atom.
pub struct LayerBuilder {
    lattice: Lattice2,
    a3: Vector3<f64>,
    superstructure: Matrix2<f64>,
    potential: OpticalPotential,
    bulk_atoms: Vec<Atom>,
    overlayer_atoms: Vec<Atom>,
}

impl LayerBuilder {
    /// Starts a builder from the bulk unit cell (Bohr). Only the in-plane
    /// components of `a1`, `a2` are used.
    pub fn new(a1: Vector3<f64>, a2: Vector3<f64>, a3: Vector3<f64>) -> Self {
        Self {
            lattice: Lattice2::new(a1.xy(), a2.xy()),
            a3,
            superstructure: Matrix2::identity(),
            potential: OpticalPotential::default(),
            bulk_atoms: Vec::new(),
            overlayer_atoms: Vec::new(),
        }
    }

    /// Superstructure matrix with rows `m1`, `m2`.
    pub fn superstructure(&mut self, m: Matrix2<f64>) -> &mut Self {
        self.superstructure = m;
        self
    }

    pub fn potential(&mut self, potential: OpticalPotential) -> &mut Self {
        self.potential = potential;
        self
    }

    pub fn add_bulk_atom(&mut self, atom: Atom) -> &mut Self {
        self.bulk_atoms.push(atom);
        self
    }

    pub fn add_overlayer_atom(&mut self, atom: Atom) -> &mut Self {
        self.overlayer_atoms.push(atom);
        self
    }

    /// Builds the surface model.
    ///
    /// # Errors
    ///
    /// Returns [`LayerBuildError`] for an empty bulk, a degenerate lattice or
    /// superstructure, overlapping layers, or more than one layer above the
    /// bulk repeat period.
    pub fn build(self, phase_shifts: PhaseShiftSet) -> Result<SurfaceModel, LayerBuildError> {
        if self.bulk_atoms.is_empty() {
            return Err(LayerBuildError::NoAtoms);
        }
        if self.lattice.area() < GEO_TOLERANCE {
            return Err(LayerBuildError::DegenerateLattice(
                "a1 and a2 are collinear".into(),
            ));
        }
        let lattice = self.lattice.right_handed();

        let det = self.superstructure.determinant();
        if det < GEO_TOLERANCE {
            return Err(LayerBuildError::DegenerateLattice(format!(
                "superstructure matrix has determinant {det:.4}; it must be positive"
            )));
        }
        let m = &self.superstructure;
        let super_lattice = Lattice2::new(
            lattice.a1 * m[(0, 0)] + lattice.a2 * m[(0, 1)],
            lattice.a1 * m[(1, 0)] + lattice.a2 * m[(1, 1)],
        );

        let mut a3 = self.a3;
        if a3.z > 0.0 {
            debug!("a3 points toward the vacuum; using -a3.");
            a3 = -a3;
        }
        if a3.z.abs() < GEO_TOLERANCE {
            return Err(LayerBuildError::DegenerateLattice(
                "a3 has no component along z".into(),
            ));
        }

        // === Phase 1: Bulk layers ===
        let mut bulk_atoms = self.bulk_atoms;
        for atom in &mut bulk_atoms {
            let folded = lattice.fold(&atom.position.xy());
            atom.position.x = folded.x;
            atom.position.y = folded.y;
        }
        let groups = split_by_height(bulk_atoms);
        let period_bottom = groups[0][0].position.z;
        let period_top = period_bottom - a3.z;
        let num_periodic = groups
            .iter()
            .take_while(|g| group_top(g) < period_top - GEO_TOLERANCE)
            .count();
        if num_periodic == 0 {
            return Err(LayerBuildError::DegenerateLattice(format!(
                "the lowest bulk layer is thicker than the repeat period |a3_z| = {:.4} Bohr",
                -a3.z
            )));
        }
        let num_terminal = groups.len() - num_periodic;
        if num_terminal > 1 {
            return Err(LayerBuildError::TooManyTerminalLayers(num_terminal));
        }

        let placed = place_groups(groups);
        let mut bulk_layers: Vec<Layer> = placed
            .iter()
            .enumerate()
            .map(|(index, (_, atoms))| Layer {
                index,
                atoms: atoms.clone(),
                lattice,
                relative_area: 1.0,
                periodic: index < num_periodic,
                vec_from_last: Vector3::zeros(),
                vec_to_next: Vector3::zeros(),
            })
            .collect();

        link_layers(&mut bulk_layers, &placed);

        // The layer below the first one is the last periodic layer, one period deeper.
        let last_periodic = num_periodic - 1;
        let below_top = placed[last_periodic].0 + a3 + bulk_layers[last_periodic].top_offset();
        let repeat = placed[0].0 - below_top;
        if repeat.z < GEO_TOLERANCE {
            return Err(LayerBuildError::LayersOverlap {
                lower: format!("bulk {last_periodic} (previous period)"),
                upper: "bulk 0".into(),
                gap: repeat.z,
            });
        }
        bulk_layers[0].vec_from_last = repeat;
        bulk_layers[last_periodic].vec_to_next = repeat;

        let bulk_top = bulk_layers.len() - 1;
        let bulk_top_point = placed[bulk_top].0 + bulk_layers[bulk_top].top_offset();
        bulk_layers[bulk_top].vec_to_next = -bulk_top_point;

        let mut bulk_min = repeat.z;
        for layer in bulk_layers.iter().skip(1) {
            bulk_min = bulk_min.min(layer.vec_from_last.z);
        }

        // === Phase 2: Overlayer ===
        let mut over_layers = Vec::new();
        let mut over_min = f64::INFINITY;
        if !self.overlayer_atoms.is_empty() {
            let mut atoms = self.overlayer_atoms;
            for atom in &mut atoms {
                let folded = super_lattice.fold(&atom.position.xy());
                atom.position.x = folded.x;
                atom.position.y = folded.y;
            }
            let placed_over = place_groups(split_by_height(atoms));
            over_layers = placed_over
                .iter()
                .enumerate()
                .map(|(index, (_, atoms))| Layer {
                    index,
                    atoms: atoms.clone(),
                    lattice: super_lattice,
                    relative_area: det,
                    periodic: false,
                    vec_from_last: Vector3::zeros(),
                    vec_to_next: Vector3::zeros(),
                })
                .collect();
            link_layers(&mut over_layers, &placed_over);

            over_layers[0].vec_from_last = placed_over[0].0;
            let gap = bulk_layers[bulk_top].vec_to_next.z + over_layers[0].vec_from_last.z;
            if gap < GEO_TOLERANCE {
                return Err(LayerBuildError::LayersOverlap {
                    lower: format!("bulk {bulk_top}"),
                    upper: "overlayer 0".into(),
                    gap,
                });
            }
            over_min = gap;
            for layer in over_layers.iter().skip(1) {
                over_min = over_min.min(layer.vec_from_last.z);
            }
            let top = over_layers.len() - 1;
            over_layers[top].vec_to_next = Vector3::new(0.0, 0.0, POTENTIAL_STEP_HEIGHT);
        }

        for (kind, layers) in [("bulk", &bulk_layers), ("overlayer", &over_layers)] {
            for layer in layers.iter().skip(1) {
                if layer.vec_from_last.z < GEO_TOLERANCE {
                    return Err(LayerBuildError::LayersOverlap {
                        lower: format!("{kind} {}", layer.index - 1),
                        upper: format!("{kind} {}", layer.index),
                        gap: layer.vec_from_last.z,
                    });
                }
            }
        }

        debug!(
            bulk_layers = bulk_layers.len(),
            periodic = num_periodic,
            overlayer_layers = over_layers.len(),
            d_min = bulk_min.min(over_min),
            "Assembled layers."
        );

        let bulk = Crystal {
            layers: bulk_layers,
            lattice,
            superstructure: self.superstructure,
            potential: self.potential,
            min_layer_distance: bulk_min,
        };
        let overlayer = Crystal {
            layers: over_layers,
            lattice: super_lattice,
            superstructure: self.superstructure,
            potential: self.potential,
            min_layer_distance: over_min.min(bulk_min),
        };

        Ok(SurfaceModel {
            bulk,
            overlayer,
            phase_shifts,
            lattice,
            super_lattice,
        })
    }
}

/// Sorts atoms by height and groups them wherever the `z` gap exceeds
/// [`MIN_LAYER_DISTANCE`]. The input must not be empty.
fn split_by_height(mut atoms: Vec<Atom>) -> Vec<Vec<Atom>> {
    atoms.sort_by(|a, b| a.position.z.total_cmp(&b.position.z));
    let mut groups: Vec<Vec<Atom>> = Vec::new();
    let mut last_z = f64::NEG_INFINITY;
    for atom in atoms {
        let z = atom.position.z;
        match groups.last_mut() {
            Some(group) if z - last_z <= MIN_LAYER_DISTANCE => group.push(atom),
            _ => groups.push(vec![atom]),
        }
        last_z = z;
    }
    groups
}

fn group_top(group: &[Atom]) -> f64 {
    group
        .iter()
        .map(|a| a.position.z)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Chooses each group's origin and expresses its atoms relative to it.
fn place_groups(groups: Vec<Vec<Atom>>) -> Vec<(Vector3<f64>, Vec<Atom>)> {
    groups
        .into_iter()
        .enumerate()
        .map(|(index, mut atoms)| {
            let lowest = atoms[0].position;
            let origin = Vector3::new(lowest.x, lowest.y, lowest.z);
            for atom in &mut atoms {
                atom.position -= origin;
                atom.layer = index;
            }
            (origin, atoms)
        })
        .collect()
}

/// Fills the interlayer vectors between consecutive layers.
fn link_layers(layers: &mut [Layer], placed: &[(Vector3<f64>, Vec<Atom>)]) {
    for i in 1..layers.len() {
        let below_top = placed[i - 1].0 + layers[i - 1].top_offset();
        let vector = placed[i].0 - below_top;
        layers[i].vec_from_last = vector;
        layers[i - 1].vec_to_next = vector;
    }
}
