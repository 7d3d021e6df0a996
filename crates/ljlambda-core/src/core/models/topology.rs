use serde::{Deserialize, Serialize};

/// A bonded quadruplet `atoms[0]-atoms[1]-atoms[2]-atoms[3]` of local particle indices
/// and its 1-based dihedral type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dihedral {
    pub atoms: [usize; 4],
    pub dihedral_type: usize,
}

impl Dihedral {
    pub fn new(atoms: [usize; 4], dihedral_type: usize) -> Self {
        Self {
            atoms,
            dihedral_type,
        }
    }

    /// The 1-4 pair: first and last atom of the quadruplet.
    pub fn end_atoms(&self) -> (usize, usize) {
        (self.atoms[0], self.atoms[3])
    }
}
