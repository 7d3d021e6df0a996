use nalgebra::Point3;
use std::fmt;
use tracing::warn;

/// A quadruplet whose combined cosine fell outside the tolerated band.
#[derive(Debug, Clone, PartialEq)]
pub struct DegenerateDihedral {
    pub rank: usize,
    pub timestep: u64,
    pub tags: [u64; 4],
    pub positions: [Point3<f64>; 4],
    pub cosine: f64,
}

impl fmt::Display for DegenerateDihedral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [t1, t2, t3, t4] = self.tags;
        write!(
            f,
            "Dihedral problem: {} {} {} {} {} {}",
            self.rank, self.timestep, t1, t2, t3, t4
        )?;
        for (ordinal, position) in ["1st", "2nd", "3rd", "4th"].iter().zip(&self.positions) {
            write!(
                f,
                "\n  {} atom: {} {} {} {}",
                ordinal, self.rank, position.x, position.y, position.z
            )?;
        }
        Ok(())
    }
}

/// Receives degenerate-geometry reports. Called at most once per quadruplet per evaluation.
pub trait WarningSink {
    fn degenerate_dihedral(&mut self, event: DegenerateDihedral);
}

impl WarningSink for Vec<DegenerateDihedral> {
    fn degenerate_dihedral(&mut self, event: DegenerateDihedral) {
        self.push(event);
    }
}

/// Forwards reports to `tracing` at WARN level.
#[derive(Debug, Default)]
pub struct TracingWarnings {
    count: usize,
}

impl TracingWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl WarningSink for TracingWarnings {
    fn degenerate_dihedral(&mut self, event: DegenerateDihedral) {
        self.count += 1;
        warn!(
            rank = event.rank,
            timestep = event.timestep,
            tags = ?event.tags,
            cosine = event.cosine,
            "{}",
            event
        );
    }
}
