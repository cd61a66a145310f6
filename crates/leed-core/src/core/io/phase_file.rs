use super::traits::TableFile;
use crate::core::constants::HARTREE_EV;
use crate::core::models::phase_shift::PhaseShiftData;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PhaseFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PhaseParseErrorKind,
    },
    #[error("Phase-shift file contains no energies")]
    Empty,
}

#[derive(Debug, Error)]
pub enum PhaseParseErrorKind {
    #[error("Missing header line 'neng lmax [eV|Ry|H]'")]
    MissingHeader,
    #[error("Invalid header '{0}'; expected 'neng lmax [eV|Ry|H]'")]
    InvalidHeader(String),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Expected {expected} phase shifts, found {found}")]
    TooFewShifts { expected: usize, found: usize },
    #[error("Energies must increase (found {current} after {previous})")]
    NonMonotonicEnergy { previous: f64, current: f64 },
}

/// Energy unit declared in a phase-shift file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    ElectronVolt,
    Rydberg,
    Hartree,
}

impl EnergyUnit {
    fn from_token(token: Option<&str>) -> Self {
        match token.map(|t| t.to_ascii_lowercase()) {
            Some(t) if t.starts_with("ev") => EnergyUnit::ElectronVolt,
            Some(t) if t.starts_with("ry") => EnergyUnit::Rydberg,
            _ => EnergyUnit::Hartree,
        }
    }

    /// Factor converting this unit to Hartree.
    pub fn to_hartree(self) -> f64 {
        match self {
            EnergyUnit::ElectronVolt => 1.0 / HARTREE_EV,
            EnergyUnit::Rydberg => 0.5,
            EnergyUnit::Hartree => 1.0,
        }
    }
}

/// The classic phase-shift table format.
///
/// ```text
/// # optional comment lines
/// neng lmax [eV|Ry|H]
/// E_1
/// δ_0(E_1) δ_1(E_1) ... δ_lmax(E_1)
/// E_2
/// ...
/// ```
///
/// Negative numbers may follow each other without a separating blank (Fortran
/// fixed-format output). A file ending before `neng` energies is accepted with
/// a warning.
pub struct PhaseShiftFile;

impl TableFile for PhaseShiftFile {
    type Data = PhaseShiftData;
    type Error = PhaseFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<PhaseShiftData, PhaseFileError> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, line)| line.map(|l| (i + 1, l)));

        let (header_line, header) = loop {
            match lines.next() {
                Some(line) => {
                    let (number, text) = line?;
                    let trimmed = text.trim();
                    if trimmed.starts_with('#') || trimmed.is_empty() {
                        continue;
                    }
                    break (number, text);
                }
                None => {
                    return Err(PhaseFileError::Parse {
                        line: 0,
                        kind: PhaseParseErrorKind::MissingHeader,
                    });
                }
            }
        };

        let mut tokens = header.split_whitespace();
        let invalid_header = || PhaseFileError::Parse {
            line: header_line,
            kind: PhaseParseErrorKind::InvalidHeader(header.trim().to_string()),
        };
        let neng: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(invalid_header)?;
        let l_max: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(invalid_header)?;
        let scale = EnergyUnit::from_token(tokens.next()).to_hartree();
        let nl = l_max + 1;

        let mut energies = Vec::with_capacity(neng);
        let mut shifts = Vec::with_capacity(neng);
        'energies: while energies.len() < neng {
            let Some(line) = lines.next() else { break };
            let (number, text) = line?;
            if text.trim().is_empty() {
                continue;
            }
            let values = split_fortran_numbers(&text, number)?;
            let Some(&energy) = values.first() else { continue };
            let energy = energy * scale;
            if let Some(&previous) = energies.last() {
                if energy <= previous {
                    return Err(PhaseFileError::Parse {
                        line: number,
                        kind: PhaseParseErrorKind::NonMonotonicEnergy {
                            previous,
                            current: energy,
                        },
                    });
                }
            }

            let mut row: Vec<f64> = values[1..].to_vec();
            let mut last_line = number;
            while row.len() < nl {
                match lines.next() {
                    Some(line) => {
                        let (number, text) = line?;
                        last_line = number;
                        row.extend(split_fortran_numbers(&text, number)?);
                    }
                    None => {
                        if row.is_empty() {
                            break 'energies;
                        }
                        return Err(PhaseFileError::Parse {
                            line: last_line,
                            kind: PhaseParseErrorKind::TooFewShifts {
                                expected: nl,
                                found: row.len(),
                            },
                        });
                    }
                }
            }
            row.truncate(nl);
            energies.push(energy);
            shifts.push(row);
        }

        if energies.is_empty() {
            return Err(PhaseFileError::Empty);
        }
        if energies.len() != neng {
            warn!(
                expected = neng,
                found = energies.len(),
                "End of file reached before all phase shifts were read."
            );
        }

        Ok(PhaseShiftData {
            energies,
            shifts,
            l_max,
        })
    }

    fn write_to(data: &PhaseShiftData, writer: &mut impl Write) -> Result<(), PhaseFileError> {
        writeln!(writer, "{} {} H", data.energies.len(), data.l_max)?;
        for (energy, row) in data.energies.iter().zip(data.shifts.iter()) {
            writeln!(writer, "{energy:.6}")?;
            let line: Vec<String> = row.iter().map(|d| format!("{d:.6}")).collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Splits a line into numbers, breaking before a `-` that does not follow an
/// exponent marker.
fn split_fortran_numbers(line: &str, line_number: usize) -> Result<Vec<f64>, PhaseFileError> {
    let mut values = Vec::new();
    for token in line.split_whitespace() {
        let mut start = 0;
        let bytes = token.as_bytes();
        for i in 1..bytes.len() {
            if bytes[i] == b'-' && !matches!(bytes[i - 1], b'e' | b'E' | b'd' | b'D') {
                values.push(parse_number(&token[start..i], line_number)?);
                start = i;
            }
        }
        values.push(parse_number(&token[start..], line_number)?);
    }
    Ok(values)
}

fn parse_number(text: &str, line_number: usize) -> Result<f64, PhaseFileError> {
    text.replace(['d', 'D'], "e")
        .parse()
        .map_err(|_| PhaseFileError::Parse {
            line: line_number,
            kind: PhaseParseErrorKind::InvalidNumber(text.to_string()),
        })
}

/// Resolves a phase-shift reference from the input to a file path: names
/// without an extension get `.phs`, relative names are looked up in `dir`.
pub fn resolve_phase_path(name: &str, dir: &Path) -> PathBuf {
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension("phs");
    }
    if path.is_absolute() {
        path
    } else {
        dir.join(path)
    }
}
