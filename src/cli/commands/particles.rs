//! `particles`: eigenvector particle field from live parameters.

use crate::cli::args::ParticlesArgs;
use crate::config::schema::AppConfig;
use crate::engine::ParticleConfig;
use crate::error::SkyntError;
use crate::service::PhiService;

use super::emit;

/// Generates the particle field and prints it after `--steps` ticks.
///
/// # Errors
///
/// Returns an error if the source cannot answer or the parameters cannot
/// seed a field.
pub async fn run(config: &AppConfig, args: &ParticlesArgs) -> Result<(), SkyntError> {
    let field = particle_config(config, args);
    if field.count == 0 {
        return Err(SkyntError::Usage("--count must be at least 1".into()));
    }

    let service = PhiService::from_config(config)?;
    let report = service.particles(field, args.steps).await?;
    emit(args.format, &report, |r| {
        println!(
            "{} particles on {}x{} after {} ticks (seed {}, {})",
            r.particles.len(),
            r.width,
            r.height,
            r.ticks,
            r.seed,
            r.source
        );
        for p in &r.particles {
            println!(
                "  {:>3} pos=({:.1}, {:.1}, {:.1}) size={:.2} hue={:.0} life={:.2}",
                p.id, p.x, p.y, p.z, p.size, p.hue, p.life
            );
        }
    })
}

fn particle_config(config: &AppConfig, args: &ParticlesArgs) -> ParticleConfig {
    ParticleConfig {
        count: args.count.unwrap_or(config.particles.count),
        width: config.particles.width,
        height: config.particles.height,
        seed: args.seed,
    }
}
