use glam::DVec3;

/// Upper bound of the particle pool at density 1.0.
pub const MAX_PARTICLES: usize = 2000;

/// Visible volume particles are scattered through.
pub const BOUND_X: f64 = 9.0;
pub const BOUND_Y: f64 = 5.0;
pub const BOUND_Z_MIN: f64 = -2.0;
pub const BOUND_Z_MAX: f64 = 4.0;

pub const SIZE_MIN: f64 = 6.0;
pub const SIZE_MAX: f64 = 18.0;

/// Opacity of a particle sprite; fixed for the pool's lifetime.
pub const PARTICLE_OPACITY: f32 = 0.35;

/// Minimal PCG-XSH-RR generator; keeps particle placement and drift jitter
/// reproducible for a given seed without pulling in a randomness crate.
#[derive(Clone, Debug)]
pub struct Pcg32 {
    state: u64,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: seed.wrapping_add(0x9e37_79b9_7f4a_7c15),
        };
        rng.next_u32();
        rng
    }

    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let xor_shifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xor_shifted.rotate_right(rot)
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / (f64::from(u32::MAX) + 1.0)
    }

    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// One drifting dust mote.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: DVec3,
    pub size: f64,
}

/// Fixed pool of atmospheric particles.
///
/// Cardinality is decided once at construction from the density setting;
/// particles that drift above the visible bound are recycled to the bottom,
/// never destroyed.
#[derive(Clone, Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
    rng: Pcg32,
}

impl ParticleField {
    pub fn new(density: f64, seed: u64) -> Self {
        let density = density.clamp(0.0, 1.0);
        let count = (MAX_PARTICLES as f64 * density).floor() as usize;
        let mut rng = Pcg32::new(seed);
        let particles = (0..count)
            .map(|_| Particle {
                position: DVec3::new(
                    rng.range(-BOUND_X, BOUND_X),
                    rng.range(-BOUND_Y, BOUND_Y),
                    rng.range(BOUND_Z_MIN, BOUND_Z_MAX),
                ),
                size: rng.range(SIZE_MIN, SIZE_MAX),
            })
            .collect();
        Self { particles, rng }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// One simulated-breeze step. Horizontal drift is phase-shifted by each
    /// particle's depth, vertical rise carries a per-particle jitter; a
    /// particle leaving the top bound reappears at the bottom with its
    /// x and z preserved.
    pub fn drift(&mut self, t_secs: f64, wind: f64) {
        let breeze = wind * 0.2;
        let Self { particles, rng } = self;
        for p in particles {
            let jitter = rng.next_f64();
            p.position.x += (t_secs * 0.2 + p.position.z).sin() * 0.002 * breeze;
            p.position.y += ((t_secs * 0.15 + p.position.x * 0.2).sin() * 0.002 + 0.001)
                * (0.5 + jitter * 0.5)
                * breeze;
            if p.position.y > BOUND_Y {
                p.position.y = -BOUND_Y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_is_floor_of_density_times_max() {
        assert_eq!(ParticleField::new(1.0, 7).len(), 2000);
        assert_eq!(ParticleField::new(0.7, 7).len(), 1400);
        assert_eq!(ParticleField::new(0.0004, 7).len(), 0);
        assert!(ParticleField::new(0.0, 7).is_empty());
    }

    #[test]
    fn pool_size_survives_drift_steps() {
        let mut field = ParticleField::new(0.25, 3);
        let initial = field.len();
        for i in 0..500 {
            field.drift(i as f64 * 0.016, 1.0);
        }
        assert_eq!(field.len(), initial);
    }

    #[test]
    fn wrap_keeps_y_within_bound() {
        let mut field = ParticleField::new(0.5, 11);
        for i in 0..2000 {
            field.drift(i as f64 * 0.016, 1.0);
            assert!(
                field
                    .particles()
                    .iter()
                    .all(|p| p.position.y <= BOUND_Y + 1e-12)
            );
        }
    }

    #[test]
    fn initial_placement_is_inside_the_volume() {
        let field = ParticleField::new(1.0, 99);
        for p in field.particles() {
            assert!(p.position.x.abs() <= BOUND_X);
            assert!(p.position.y.abs() <= BOUND_Y);
            assert!(p.position.z >= BOUND_Z_MIN && p.position.z <= BOUND_Z_MAX);
            assert!(p.size >= SIZE_MIN && p.size <= SIZE_MAX);
        }
    }

    #[test]
    fn same_seed_same_field() {
        let a = ParticleField::new(0.1, 42);
        let b = ParticleField::new(0.1, 42);
        for (pa, pb) in a.particles().iter().zip(b.particles()) {
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.size, pb.size);
        }
    }

    #[test]
    fn zero_wind_freezes_the_field() {
        let mut field = ParticleField::new(0.1, 5);
        let before: Vec<_> = field.particles().to_vec();
        field.drift(1.0, 0.0);
        for (a, b) in before.iter().zip(field.particles()) {
            assert_eq!(a.position, b.position);
        }
    }
}
