use super::phase_file::{PhaseFileError, PhaseShiftFile, resolve_phase_path};
use super::traits::TableFile;
use crate::core::constants::{DEFAULT_TEMPERATURE, HARTREE_EV, angstrom_to_bohr};
use crate::core::models::atom::Atom;
use crate::core::models::builder::{LayerBuildError, LayerBuilder};
use crate::core::models::crystal::{OpticalPotential, SurfaceModel};
use crate::core::models::phase_shift::{PhaseShiftData, PhaseShiftSet, Vibration, VibrationError};
use nalgebra::{Matrix2, Vector3};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StructureLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Phase-shift file '{path}': {source}")]
    PhaseFile {
        path: String,
        source: PhaseFileError,
    },
    #[error("Invalid vibration parameters: {0}")]
    Vibration(#[from] VibrationError),
    #[error("Layer assembly failed: {0}")]
    Layers(#[from] LayerBuildError),
}

/// Unit cell of the bulk in Å. `a3` is the bulk repeat vector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitCell {
    pub a1: [f64; 3],
    pub a2: [f64; 3],
    pub a3: [f64; 3],
}

/// Superstructure matrix rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Superstructure {
    pub m1: [f64; 2],
    pub m2: [f64; 2],
}

impl Default for Superstructure {
    fn default() -> Self {
        Self {
            m1: [1.0, 0.0],
            m2: [0.0, 1.0],
        }
    }
}

/// Optical potential in eV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OpticalPotentialInput {
    pub real: f64,
    pub imaginary: f64,
    #[serde(default)]
    pub exponent: f64,
}

impl Default for OpticalPotentialInput {
    fn default() -> Self {
        Self {
            real: -8.0,
            imaginary: 4.0,
            exponent: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AtomInput {
    /// Phase-shift file name, resolved against the phase directory.
    pub phase_file: String,
    /// Cartesian position in Å.
    pub position: [f64; 3],
    #[serde(default)]
    pub vibration: Vibration,
}

/// Structural part of an input file.
///
/// ```toml
/// [structure]
/// unit-cell = { a1 = [2.49, 0, 0], a2 = [1.245, 2.156, 0], a3 = [0, 0, -2.03] }
/// optical-potential = { real = -8.0, imaginary = 4.0 }
///
/// [[structure.bulk-atoms]]
/// phase-file = "Ni"
/// position = [0.0, 0.0, 0.0]
/// vibration = { type = "dr1", rms = 0.1 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StructureDocument {
    #[serde(default)]
    pub system_name: Option<String>,
    pub unit_cell: UnitCell,
    #[serde(default)]
    pub superstructure: Superstructure,
    #[serde(default)]
    pub optical_potential: OpticalPotentialInput,
    #[serde(default)]
    pub sample_temperature: Option<f64>,
    pub bulk_atoms: Vec<AtomInput>,
    #[serde(default)]
    pub overlayer_atoms: Vec<AtomInput>,
}

impl StructureDocument {
    /// Parses a standalone structure document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, StructureLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| StructureLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| StructureLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Reads the referenced phase-shift files and assembles the surface model.
    ///
    /// Each phase-shift file is read once; atom types are deduplicated by
    /// (file, vibration, T-matrix kind). Inputs in Å and eV are converted to
    /// Bohr and Hartree. A positive real optical potential or a negative
    /// imaginary one is sign-flipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a phase-shift file cannot be read, a vibration
    /// model is invalid, or the layers cannot be assembled.
    pub fn load_surface(&self, phase_dir: &Path) -> Result<SurfaceModel, StructureLoadError> {
        let to_bohr = |v: &[f64; 3]| {
            Vector3::new(angstrom_to_bohr(v[0]), angstrom_to_bohr(v[1]), angstrom_to_bohr(v[2]))
        };
        let temperature = self.sample_temperature.unwrap_or(DEFAULT_TEMPERATURE);

        let mut potential = OpticalPotential {
            real: self.optical_potential.real / HARTREE_EV,
            imaginary: self.optical_potential.imaginary / HARTREE_EV,
            exponent: self.optical_potential.exponent,
        };
        if potential.real > 0.0 {
            warn!(
                vr_ev = self.optical_potential.real,
                "Real optical potential must be negative; using its negative."
            );
            potential.real = -potential.real;
        }
        if potential.imaginary < 0.0 {
            warn!(
                vi_ev = self.optical_potential.imaginary,
                "Imaginary optical potential must be positive; using its negative."
            );
            potential.imaginary = -potential.imaginary;
        }

        let mut builder = LayerBuilder::new(
            to_bohr(&self.unit_cell.a1),
            to_bohr(&self.unit_cell.a2),
            to_bohr(&self.unit_cell.a3),
        );
        builder
            .superstructure(Matrix2::new(
                self.superstructure.m1[0],
                self.superstructure.m1[1],
                self.superstructure.m2[0],
                self.superstructure.m2[1],
            ))
            .potential(potential);

        let mut loaded: HashMap<String, Arc<PhaseShiftData>> = HashMap::new();
        let mut phase_shifts = PhaseShiftSet::new();
        let mut make_atom = |input: &AtomInput| -> Result<Atom, StructureLoadError> {
            let path = resolve_phase_path(&input.phase_file, phase_dir);
            let key = path.to_string_lossy().to_string();
            let data = match loaded.get(&key) {
                Some(data) => data.clone(),
                None => {
                    let data = Arc::new(PhaseShiftFile::read_from_path(&path).map_err(|e| {
                        StructureLoadError::PhaseFile {
                            path: key.clone(),
                            source: e,
                        }
                    })?);
                    loaded.insert(key.clone(), data.clone());
                    data
                }
            };
            let (displacement, kind) = input.vibration.resolve(temperature)?;
            let scattering_type =
                phase_shifts.register(&input.phase_file, data, displacement, kind);
            Ok(Atom::new(scattering_type, to_bohr(&input.position))
                .with_displacement(displacement.mean_square))
        };

        for input in &self.bulk_atoms {
            builder.add_bulk_atom(make_atom(input)?);
        }
        for input in &self.overlayer_atoms {
            builder.add_overlayer_atom(make_atom(input)?);
        }

        let model = builder.build(phase_shifts)?;
        info!(
            system = self.system_name.as_deref().unwrap_or("unnamed"),
            bulk_layers = model.bulk.layers.len(),
            overlayer_layers = model.overlayer.layers.len(),
            atom_types = model.phase_shifts.len(),
            "Loaded surface structure."
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_phase_file(dir: &Path, name: &str) {
        fs::write(
            dir.join(format!("{name}.phs")),
            "2 1 eV\n20.0\n0.5 0.1\n400.0\n0.3 0.2\n",
        )
        .unwrap();
    }

    const DOCUMENT: &str = r#"
        system-name = "Ni(100)-c(2x2)O"
        unit-cell = { a1 = [2.49, 0.0, 0.0], a2 = [0.0, 2.49, 0.0], a3 = [0.0, 0.0, -1.76] }
        superstructure = { m1 = [1.0, 1.0], m2 = [-1.0, 1.0] }
        optical-potential = { real = 8.0, imaginary = 4.0 }

        [[bulk-atoms]]
        phase-file = "Ni"
        position = [0.0, 0.0, 0.0]
        vibration = { type = "dr1", rms = 0.1 }

        [[overlayer-atoms]]
        phase-file = "O"
        position = [0.0, 0.0, 1.8]
        vibration = { type = "nd3", x = 0.1, y = 0.1, z = 0.15 }

        [[overlayer-atoms]]
        phase-file = "Ni"
        position = [1.245, 1.245, 1.8]
        vibration = { type = "dr1", rms = 0.1 }
    "#;

    #[test]
    fn document_loads_into_surface_model() {
        let dir = tempdir().unwrap();
        write_phase_file(dir.path(), "Ni");
        write_phase_file(dir.path(), "O");

        let doc: StructureDocument = toml::from_str(DOCUMENT).unwrap();
        let model = doc.load_surface(dir.path()).unwrap();

        assert_eq!(model.bulk.layers.len(), 1);
        assert_eq!(model.overlayer.layers.len(), 1);
        assert_eq!(model.overlayer.layers[0].atoms.len(), 2);
        assert_eq!(model.phase_shifts.len(), 2);
        assert!(model.phase_shifts.has_non_diagonal());
        assert!(model.bulk.potential.real < 0.0);
        assert!((model.relative_super_area() - 2.0).abs() < 1e-10);
        let energies = &model.phase_shifts.get(0).unwrap().data.energies;
        assert!((energies[1] - 400.0 / HARTREE_EV).abs() < 1e-12);
    }

    #[test]
    fn missing_phase_file_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let doc: StructureDocument = toml::from_str(DOCUMENT).unwrap();
        let err = doc.load_surface(dir.path()).unwrap_err();
        match err {
            StructureLoadError::PhaseFile { path, .. } => assert!(path.ends_with("Ni.phs")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = DOCUMENT.replace("system-name", "system-nam");
        assert!(toml::from_str::<StructureDocument>(&text).is_err());
    }

    #[test]
    fn unknown_vibration_kind_is_a_toml_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("structure.toml");
        fs::write(&path, DOCUMENT.replace("\"nd3\"", "\"xyz\"")).unwrap();
        match StructureDocument::from_file(&path) {
            Err(StructureLoadError::Toml { path: p, source }) => {
                assert!(p.ends_with("structure.toml"));
                assert!(source.to_string().contains("xyz"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn from_file_reports_toml_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "unit-cell = 3").unwrap();
        assert!(matches!(
            StructureDocument::from_file(&path),
            Err(StructureLoadError::Toml { .. })
        ));
    }
}
