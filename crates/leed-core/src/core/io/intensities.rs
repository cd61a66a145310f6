use super::traits::TableFile;
use crate::core::constants::{ev_to_hartree, hartree_to_ev};
use crate::core::models::beam::Beam;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntensityFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid column header '{0}'; expected a beam label such as '(1,-1/2)'")]
    InvalidHeader(String),
    #[error("Row {row} has {found} intensities, expected {expected}")]
    RowLength {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Intensity-versus-energy table: one row per energy, one column per beam.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IvTable {
    /// Beam indices `(ind_1, ind_2)` in 1×1 reciprocal-lattice units.
    pub beams: Vec<(f64, f64)>,
    /// Energies in Hartree, ascending.
    pub energies: Vec<f64>,
    /// `intensities[i][b]` belongs to `energies[i]` and `beams[b]`.
    pub intensities: Vec<Vec<f64>>,
}

impl IvTable {
    pub fn new(beams: &[Beam]) -> Self {
        Self {
            beams: beams.iter().map(|b| (b.ind_1, b.ind_2)).collect(),
            energies: Vec::new(),
            intensities: Vec::new(),
        }
    }

    pub fn push(&mut self, energy: f64, intensities: Vec<f64>) {
        self.energies.push(energy);
        self.intensities.push(intensities);
    }

    /// Intensity curve of beam `index` as `(energy, intensity)` pairs.
    pub fn curve(&self, index: usize) -> Vec<(f64, f64)> {
        self.energies
            .iter()
            .zip(self.intensities.iter())
            .filter_map(|(&e, row)| row.get(index).map(|&i| (e, i)))
            .collect()
    }
}

/// Comma-separated IV curves, energies in eV.
///
/// The header row is `energy_ev` followed by one beam label per column.
pub struct IvCurveFile;

impl TableFile for IvCurveFile {
    type Data = IvTable;
    type Error = IntensityFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<IvTable, IntensityFileError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let beams = headers
            .iter()
            .skip(1)
            .map(|label| {
                parse_label(label).ok_or_else(|| IntensityFileError::InvalidHeader(label.into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = IvTable {
            beams,
            ..IvTable::default()
        };
        for (row, record) in csv_reader.deserialize::<Vec<f64>>().enumerate() {
            let values = record?;
            if values.len() != table.beams.len() + 1 {
                return Err(IntensityFileError::RowLength {
                    row: row + 1,
                    found: values.len().saturating_sub(1),
                    expected: table.beams.len(),
                });
            }
            table.push(ev_to_hartree(values[0]), values[1..].to_vec());
        }
        Ok(table)
    }

    fn write_to(table: &IvTable, writer: &mut impl Write) -> Result<(), IntensityFileError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header = vec!["energy_ev".to_string()];
        header.extend(table.beams.iter().map(|&(a, b)| beam_label(a, b)));
        csv_writer.write_record(&header)?;
        for (energy, row) in table.energies.iter().zip(table.intensities.iter()) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(format!("{:.4}", hartree_to_ev(*energy)));
            record.extend(row.iter().map(|i| format!("{i:.6e}")));
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Writes the output beam list as CSV (`index,ind_1,ind_2,set,label`).
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_beam_list(beams: &[Beam], writer: &mut impl Write) -> Result<(), IntensityFileError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["index", "ind_1", "ind_2", "set", "label"])?;
    for (index, beam) in beams.iter().enumerate() {
        csv_writer.write_record([
            index.to_string(),
            format!("{:.4}", beam.ind_1),
            format!("{:.4}", beam.ind_2),
            beam.set.to_string(),
            beam.label(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn beam_label(ind_1: f64, ind_2: f64) -> String {
    Beam {
        ind_1,
        ind_2,
        super_1: 0,
        super_2: 0,
        g: nalgebra::Vector2::zeros(),
        set: 0,
    }
    .label()
}

fn parse_label(label: &str) -> Option<(f64, f64)> {
    let inner = label.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (a, b) = inner.split_once(',')?;
    Some((parse_fraction(a)?, parse_fraction(b)?))
}

fn parse_fraction(text: &str) -> Option<f64> {
    match text.trim().split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.trim().parse().ok()?;
            let d: f64 = d.trim().parse().ok()?;
            (d != 0.0).then(|| n / d)
        }
        None => text.trim().parse().ok(),
    }
}
