//! Eigenvector particle-flow field.
//!
//! Each particle is seeded from one parameter index (`i mod N`) and offset
//! from the canvas centre by
//!
//! ```text
//! offset_axis = ((jitter - 0.5) * 200 + value/10000 * axis_scale) * eigen/1000
//! ```
//!
//! with `axis_scale = {2, 1.5, 3}` for `{x, y, z}`. Every tick integrates
//! velocity into position, damps velocity by 0.99 with a small random
//! perturbation, fades `life`, and wraps x/y at the canvas bounds.
//!
//! The RNG is seeded so a given seed always yields the same field.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::PhiError;

use super::check_non_negative;

/// Per-axis scale applied to the normalized value.
pub const AXIS_SCALE: [f64; 3] = [2.0, 1.5, 3.0];

/// Spread of the random jitter term, in pixels.
const JITTER_SPREAD: f64 = 200.0;

/// Eigen-coefficient normalization divisor.
const EIGEN_NORMALIZER: f64 = 1000.0;

/// Value normalization divisor.
const VALUE_NORMALIZER: f64 = 10_000.0;

/// Per-tick velocity damping.
const DAMPING: f64 = 0.99;

/// Magnitude of the per-tick random velocity perturbation.
const EIGEN_INFLUENCE: f64 = 0.01;

/// Life lost per tick.
const FADE_PER_TICK: f64 = 0.01;

/// Field dimensions and population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleConfig {
    /// Number of particles.
    pub count: usize,
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels.
    pub height: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 50,
            width: 800.0,
            height: 600.0,
            seed: 0,
        }
    }
}

/// One particle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    /// Index within the field.
    pub id: usize,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Depth.
    pub z: f64,
    /// Horizontal velocity.
    pub vx: f64,
    /// Vertical velocity.
    pub vy: f64,
    /// Depth velocity.
    pub vz: f64,
    /// Base radius in pixels.
    pub size: f64,
    /// Hue in degrees, one band per parameter index.
    pub hue: f64,
    /// Remaining life in `(0, 1]`.
    pub life: f64,
}

/// Computes the 3-D offset of a particle for one parameter index.
///
/// `jitter` holds one uniform sample in `[0, 1)` per axis. Inputs are raw
/// (un-normalized) eigen and value entries.
#[must_use]
pub fn offset(eigen: f64, value: f64, jitter: [f64; 3]) -> [f64; 3] {
    let eigen = eigen / EIGEN_NORMALIZER;
    let value = value / VALUE_NORMALIZER;
    let mut out = [0.0; 3];
    for (axis, slot) in out.iter_mut().enumerate() {
        *slot = (jitter[axis] - 0.5).mul_add(JITTER_SPREAD, value * AXIS_SCALE[axis]) * eigen;
    }
    out
}

/// A seeded, steppable particle field.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    config: ParticleConfig,
    rng: StdRng,
    ticks: u64,
}

impl ParticleField {
    /// Generates a field from eigen-coefficients and values.
    ///
    /// # Errors
    ///
    /// Returns [`PhiError`] if the slices differ in length, are empty,
    /// or contain negative or non-finite entries, and
    /// [`PhiError::Overflow`] if an offset leaves the `f64` range.
    pub fn generate(
        eigen_vectors: &[f64],
        values: &[f64],
        config: ParticleConfig,
    ) -> Result<Self, PhiError> {
        if eigen_vectors.len() != values.len() {
            return Err(PhiError::LengthMismatch {
                left: "eigenVectors",
                left_len: eigen_vectors.len(),
                right: "values",
                right_len: values.len(),
            });
        }
        if eigen_vectors.is_empty() {
            return Err(PhiError::Empty);
        }
        check_non_negative("eigenVectors", eigen_vectors)?;
        check_non_negative("values", values)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let centre = (config.width / 2.0, config.height / 2.0);

        let particles = (0..config.count)
            .map(|id| {
                let index = id % eigen_vectors.len();
                let jitter = [rng.random::<f64>(), rng.random::<f64>(), rng.random::<f64>()];
                let [dx, dy, dz] = offset(eigen_vectors[index], values[index], jitter);
                #[allow(clippy::cast_precision_loss)]
                let hue = 30.0_f64.mul_add(index as f64, 180.0);
                Particle {
                    id,
                    x: centre.0 + dx,
                    y: centre.1 + dy,
                    z: dz,
                    vx: (rng.random::<f64>() - 0.5) * 2.0,
                    vy: (rng.random::<f64>() - 0.5) * 2.0,
                    vz: (rng.random::<f64>() - 0.5) * 0.5,
                    size: 3.0_f64.mul_add(rng.random::<f64>(), 3.0),
                    hue,
                    life: 1.0,
                }
            })
            .collect::<Vec<_>>();

        if particles
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(PhiError::Overflow("particle offset"));
        }

        Ok(Self {
            particles,
            config,
            rng,
            ticks: 0,
        })
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        let (width, height) = (self.config.width, self.config.height);
        for p in &mut self.particles {
            let x = p.x + p.vx;
            let y = p.y + p.vy;
            p.z += p.vz;

            p.vx = p.vx.mul_add(DAMPING, (self.rng.random::<f64>() - 0.5) * EIGEN_INFLUENCE);
            p.vy = p.vy.mul_add(DAMPING, (self.rng.random::<f64>() - 0.5) * EIGEN_INFLUENCE);
            p.vz *= DAMPING;

            p.x = wrap(x, width);
            p.y = wrap(y, height);

            let life = p.life - FADE_PER_TICK;
            p.life = if life > 0.0 { life } else { 1.0 };
        }
        self.ticks += 1;
    }

    /// Advances the simulation by `n` ticks.
    pub fn advance(&mut self, n: u64) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Current particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The configuration this field was generated with.
    #[must_use]
    pub const fn config(&self) -> &ParticleConfig {
        &self.config
    }
}

fn wrap(pos: f64, extent: f64) -> f64 {
    if pos < 0.0 {
        extent
    } else if pos > extent {
        0.0
    } else {
        pos
    }
}
