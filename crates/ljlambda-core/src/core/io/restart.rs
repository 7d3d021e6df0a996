use super::PersistenceError;
use crate::core::forcefield::params::{CoefficientRecord, CoefficientTable};
use std::io::{Read, Write};

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Process group that shares one coefficient table.
pub trait Communicator {
    fn rank(&self) -> usize;

    /// Overwrites `data` on every rank with the contents held by `root`.
    fn broadcast(&self, data: &mut [f64], root: usize);
}

/// A group of one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn broadcast(&self, _data: &mut [f64], _root: usize) {}
}

/// Writes `epsilon`, `sigma`, `lambda` and `epsdihed` as four consecutive blocks of one
/// native-endian `f64` per dihedral type. Every type must be set.
pub fn write_restart<W: Write>(
    table: &CoefficientTable,
    writer: &mut W,
) -> Result<(), PersistenceError> {
    let records = set_records(table)?;

    let fields: [fn(&CoefficientRecord) -> f64; 4] = [
        CoefficientRecord::epsilon,
        CoefficientRecord::sigma,
        CoefficientRecord::lambda,
        CoefficientRecord::epsdihed,
    ];
    for field in fields {
        for &record in &records {
            writer.write_all(&field(record).to_ne_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Reads the blocks written by [`write_restart`] on rank 0, broadcasts them and rebuilds
/// the table with every type set and every prefactor re-derived.
pub fn read_restart<R: Read, C: Communicator>(
    reader: &mut R,
    n_types: usize,
    comm: &C,
) -> Result<CoefficientTable, PersistenceError> {
    let mut epsilon = vec![0.0; n_types];
    let mut sigma = vec![0.0; n_types];
    let mut lambda = vec![0.0; n_types];
    let mut epsdihed = vec![0.0; n_types];

    if comm.rank() == 0 {
        for block in [&mut epsilon, &mut sigma, &mut lambda, &mut epsdihed] {
            read_block(reader, block)?;
        }
    }
    for block in [&mut epsilon, &mut sigma, &mut lambda, &mut epsdihed] {
        comm.broadcast(block, 0);
    }

    Ok(CoefficientTable::from_base_parameters(
        &epsilon, &sigma, &lambda, &epsdihed,
    ))
}

fn read_block<R: Read>(reader: &mut R, block: &mut [f64]) -> Result<(), PersistenceError> {
    let mut buffer = [0u8; F64_BYTES];
    for value in block.iter_mut() {
        reader.read_exact(&mut buffer)?;
        *value = f64::from_ne_bytes(buffer);
    }
    Ok(())
}

pub(super) fn set_records(
    table: &CoefficientTable,
) -> Result<Vec<&CoefficientRecord>, PersistenceError> {
    table
        .iter()
        .map(|(dihedral_type, record)| {
            record.ok_or(PersistenceError::CoefficientsNotSet(dihedral_type))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::TypeRange;
    use std::cell::RefCell;
    use std::io::Cursor;

    fn table() -> CoefficientTable {
        let mut table = CoefficientTable::new(3);
        table
            .set_coefficients(TypeRange::new(1, 2), 1.0, 4.0, 0.5, 0.0)
            .unwrap();
        table
            .set_coefficients(TypeRange::single(3), 0.237, 3.1, 0.013, -0.4)
            .unwrap();
        table
    }

    #[test]
    fn restart_round_trip_restores_identical_table() {
        let original = table();
        let mut bytes = Vec::new();
        write_restart(&original, &mut bytes).unwrap();

        let restored = read_restart(&mut Cursor::new(&bytes), 3, &SingleProcess).unwrap();
        assert_eq!(restored, original);

        let mut rewritten = Vec::new();
        write_restart(&restored, &mut rewritten).unwrap();
        assert_eq!(rewritten, bytes);
    }

    #[test]
    fn restart_layout_is_one_block_per_field() {
        let mut bytes = Vec::new();
        write_restart(&table(), &mut bytes).unwrap();
        assert_eq!(bytes.len(), 4 * 3 * F64_BYTES);

        let value_at = |slot: usize| {
            let mut buffer = [0u8; F64_BYTES];
            buffer.copy_from_slice(&bytes[slot * F64_BYTES..(slot + 1) * F64_BYTES]);
            f64::from_ne_bytes(buffer)
        };
        assert_eq!(value_at(0), 1.0);
        assert_eq!(value_at(2), 0.237);
        assert_eq!(value_at(3), 4.0);
        assert_eq!(value_at(8), 0.013);
        assert_eq!(value_at(11), -0.4);
    }

    #[test]
    fn write_restart_fails_when_a_type_is_unset() {
        let mut partial = CoefficientTable::new(2);
        partial
            .set_coefficients(TypeRange::single(1), 1.0, 1.0, 1.0, 0.0)
            .unwrap();
        let result = write_restart(&partial, &mut Vec::new());
        assert!(matches!(result, Err(PersistenceError::CoefficientsNotSet(2))));
    }

    #[test]
    fn read_restart_fails_on_truncated_input() {
        let mut bytes = Vec::new();
        write_restart(&table(), &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 1);

        let result = read_restart(&mut Cursor::new(&bytes), 3, &SingleProcess);
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }

    /// Plays a non-root rank: never touches the reader and receives the root's blocks in order.
    struct FollowerRank {
        blocks: RefCell<Vec<Vec<f64>>>,
    }

    impl Communicator for FollowerRank {
        fn rank(&self) -> usize {
            1
        }

        fn broadcast(&self, data: &mut [f64], root: usize) {
            assert_eq!(root, 0);
            let block = self.blocks.borrow_mut().remove(0);
            data.copy_from_slice(&block);
        }
    }

    #[test]
    fn non_root_rank_builds_table_from_broadcast_values() {
        let comm = FollowerRank {
            blocks: RefCell::new(vec![
                vec![1.0, 0.237],
                vec![4.0, 3.1],
                vec![0.5, 0.013],
                vec![0.0, -0.4],
            ]),
        };
        let mut empty = Cursor::new(Vec::<u8>::new());

        let restored = read_restart(&mut empty, 2, &comm).unwrap();
        assert_eq!(
            restored.get(2),
            Some(&CoefficientRecord::new(0.237, 3.1, 0.013, -0.4))
        );
        assert_eq!(restored.first_unset(), None);
    }
}
