use crate::core::models::system::ParticleSystem;
use crate::core::models::topology::Dihedral;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Duplicate particle tag {tag} in '{path}'")]
    DuplicateTag { path: String, tag: u64 },
    #[error("Dihedral on line {line} of '{path}' references unknown particle tag {tag}")]
    UnknownTag { path: String, line: usize, tag: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub tag: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One dihedral row. Atoms are given by particle tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DihedralRecord {
    pub atom1: u64,
    pub atom2: u64,
    pub atom3: u64,
    pub atom4: u64,
    #[serde(rename = "type")]
    pub dihedral_type: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceRecord {
    pub tag: u64,
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
}

/// Force row with the particle's share of the interaction energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceEnergyRecord {
    pub tag: u64,
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub energy: f64,
}

pub fn read_particles(path: &Path) -> Result<ParticleSystem, InputError> {
    let file = open(path)?;
    read_particles_from(file, &path_label(path))
}

/// Particles are stored in file order, so the first row becomes local index 0.
pub fn read_particles_from<R: Read>(reader: R, label: &str) -> Result<ParticleSystem, InputError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut system = ParticleSystem::new();
    let mut seen = HashSet::new();

    for result in reader.deserialize::<ParticleRecord>() {
        let record = result.map_err(|e| csv_error(label, e))?;
        if !seen.insert(record.tag) {
            return Err(InputError::DuplicateTag {
                path: label.to_string(),
                tag: record.tag,
            });
        }
        system.add_particle(record.tag, Point3::new(record.x, record.y, record.z));
    }
    Ok(system)
}

pub fn read_dihedrals(path: &Path, system: &ParticleSystem) -> Result<Vec<Dihedral>, InputError> {
    let file = open(path)?;
    read_dihedrals_from(file, &path_label(path), system)
}

/// Resolves each row's particle tags to local indices of `system`.
pub fn read_dihedrals_from<R: Read>(
    reader: R,
    label: &str,
    system: &ParticleSystem,
) -> Result<Vec<Dihedral>, InputError> {
    let index_of: HashMap<u64, usize> = system
        .tags()
        .iter()
        .enumerate()
        .map(|(idx, &tag)| (tag, idx))
        .collect();

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut dihedrals = Vec::new();

    for (row, result) in reader.deserialize::<DihedralRecord>().enumerate() {
        let record = result.map_err(|e| csv_error(label, e))?;
        let resolve = |tag: u64| {
            index_of
                .get(&tag)
                .copied()
                .ok_or_else(|| InputError::UnknownTag {
                    path: label.to_string(),
                    line: row + 2,
                    tag,
                })
        };
        let atoms = [
            resolve(record.atom1)?,
            resolve(record.atom2)?,
            resolve(record.atom3)?,
            resolve(record.atom4)?,
        ];
        dihedrals.push(Dihedral::new(atoms, record.dihedral_type));
    }
    Ok(dihedrals)
}

/// Writes accumulated forces, one row per particle in store order. When
/// `per_atom_energy` is given an `energy` column is appended.
pub fn write_forces(
    path: &Path,
    system: &ParticleSystem,
    per_atom_energy: Option<&[f64]>,
) -> Result<(), InputError> {
    let file = std::fs::File::create(path).map_err(|e| InputError::Io {
        path: path_label(path),
        source: e,
    })?;
    write_forces_to(file, &path_label(path), system, per_atom_energy)
}

pub fn write_forces_to<W: Write>(
    writer: W,
    label: &str,
    system: &ParticleSystem,
    per_atom_energy: Option<&[f64]>,
) -> Result<(), InputError> {
    let mut writer = csv::Writer::from_writer(writer);
    for (i, (&tag, force)) in system.tags().iter().zip(system.forces()).enumerate() {
        let written = match per_atom_energy {
            Some(energies) => writer.serialize(ForceEnergyRecord {
                tag,
                fx: force.x,
                fy: force.y,
                fz: force.z,
                energy: energies.get(i).copied().unwrap_or(0.0),
            }),
            None => writer.serialize(ForceRecord {
                tag,
                fx: force.x,
                fy: force.y,
                fz: force.z,
            }),
        };
        written.map_err(|e| csv_error(label, e))?;
    }
    writer.flush().map_err(|e| InputError::Io {
        path: label.to_string(),
        source: e,
    })
}

fn open(path: &Path) -> Result<std::fs::File, InputError> {
    std::fs::File::open(path).map_err(|e| InputError::Io {
        path: path_label(path),
        source: e,
    })
}

fn path_label(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn csv_error(label: &str, source: csv::Error) -> InputError {
    InputError::Csv {
        path: label.to_string(),
        source,
    }
}
