use nalgebra::{Point3, Vector3};

/// Positions, persistent tags and force accumulators addressed by local particle index.
pub trait ParticleStore {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position(&self, index: usize) -> Point3<f64>;

    /// Persistent identifier of the particle, stable across ranks and timesteps.
    fn tag(&self, index: usize) -> u64;

    fn add_force(&mut self, index: usize, force: &Vector3<f64>);
}

/// Decides whether this process writes forces into a particle.
pub trait Ownership {
    fn accumulates(&self, index: usize) -> bool;
}

/// Owned particles occupy indices `0..nlocal`; ghosts follow. With `newton_bond` every
/// particle touched by a dihedral receives its force and the ghost contributions are
/// reduced elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewtonOwnership {
    pub nlocal: usize,
    pub newton_bond: bool,
}

impl NewtonOwnership {
    pub fn new(nlocal: usize, newton_bond: bool) -> Self {
        Self {
            nlocal,
            newton_bond,
        }
    }
}

impl Ownership for NewtonOwnership {
    #[inline]
    fn accumulates(&self, index: usize) -> bool {
        self.newton_bond || index < self.nlocal
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticleSystem {
    positions: Vec<Point3<f64>>,
    tags: Vec<u64>,
    forces: Vec<Vector3<f64>>,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a particle with a zeroed force and returns its local index.
    pub fn add_particle(&mut self, tag: u64, position: Point3<f64>) -> usize {
        self.positions.push(position);
        self.tags.push(tag);
        self.forces.push(Vector3::zeros());
        self.positions.len() - 1
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    pub fn tags(&self) -> &[u64] {
        &self.tags
    }

    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    pub fn force(&self, index: usize) -> Option<&Vector3<f64>> {
        self.forces.get(index)
    }

    pub fn clear_forces(&mut self) {
        self.forces.fill(Vector3::zeros());
    }
}

impl ParticleStore for ParticleSystem {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, index: usize) -> Point3<f64> {
        self.positions[index]
    }

    fn tag(&self, index: usize) -> u64 {
        self.tags[index]
    }

    fn add_force(&mut self, index: usize, force: &Vector3<f64>) {
        self.forces[index] += force;
    }
}
