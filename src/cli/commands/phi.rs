//! `phi current`, `phi details` and `phi compute`.

use serde_json::json;

use crate::cli::args::{ComputeArgs, FormatArgs};
use crate::config::schema::AppConfig;
use crate::engine::{PhiParameterSet, compute_delta_s, compute_total, compute_total_exact};
use crate::error::SkyntError;
use crate::service::PhiService;

use super::{emit, parse_f64_list, parse_u256_list};

/// Prints the current Φ total.
///
/// # Errors
///
/// Returns an error if the source cannot be built or cannot answer.
pub async fn current(config: &AppConfig, args: &FormatArgs) -> Result<(), SkyntError> {
    let service = PhiService::from_config(config)?;
    let reading = service.current_phi().await?;
    emit(args.format, &reading, |r| {
        println!("Φ = {} ({})", r.phi_total, r.source);
    })
}

/// Prints the parameter set and the engine's derived metrics.
///
/// # Errors
///
/// Returns an error if the source cannot answer or the parameters are
/// rejected by the engine.
pub async fn details(config: &AppConfig, args: &FormatArgs) -> Result<(), SkyntError> {
    let service = PhiService::from_config(config)?;
    let details = service.details().await?;
    emit(args.format, &details, |d| {
        println!("source      {}", d.source);
        println!("parameters  {}", d.parameter_count);
        for (i, ((w, v), e)) in d
            .parameters
            .weights()
            .iter()
            .zip(d.parameters.values())
            .zip(d.parameters.eigen_vectors())
            .enumerate()
        {
            println!("  [{i}] weight={w} value={v} eigen={e}");
        }
        println!("Φ total     {}", d.total);
        println!("Φ (engine)  {:.4}", d.phi.total);
        println!("ΔS_geom     {:.4}", d.phi.delta_geom);
        println!("ΔS_protocol {:.4}", d.phi.delta_protocol);
        println!("ΔS_total    {:.4}", d.phi.delta_total);
    })
}

/// Runs the engine over parameters given on the command line.
///
/// # Errors
///
/// Returns [`SkyntError::Usage`] for unparseable numbers and
/// [`SkyntError::Phi`] for inputs the engine rejects.
pub fn compute(args: &ComputeArgs) -> Result<(), SkyntError> {
    let report = if args.exact {
        compute_exact(args)?
    } else {
        compute_float(args)?
    };
    emit(args.format, &report, |r| {
        println!("Φ = {}", render(&r["total"]));
        for key in ["deltaGeom", "deltaProtocol", "deltaTotal"] {
            if let Some(v) = r.get(key) {
                println!("{key} = {}", render(v));
            }
        }
    })
}

fn compute_float(args: &ComputeArgs) -> Result<serde_json::Value, SkyntError> {
    let weights = parse_f64_list("weights", &args.weights)?;
    let values = parse_f64_list("values", &args.values)?;
    let total = compute_total(&weights, &values)?;

    let Some(eigen) = &args.eigen else {
        return Ok(json!({ "total": total }));
    };
    let eigen = parse_f64_list("eigen", eigen)?;
    let delta = compute_delta_s(&weights, &values, &eigen)?;
    Ok(json!({
        "total": total,
        "deltaGeom": delta.geom,
        "deltaProtocol": delta.protocol,
        "deltaTotal": delta.total,
    }))
}

fn compute_exact(args: &ComputeArgs) -> Result<serde_json::Value, SkyntError> {
    let weights = parse_u256_list("weights", "weights", &args.weights)?;
    let values = parse_u256_list("values", "values", &args.values)?;

    let Some(eigen) = &args.eigen else {
        let total = compute_total_exact(&weights, &values)?;
        return Ok(json!({ "total": total.to_string() }));
    };
    let eigen = parse_u256_list("eigen", "eigenVectors", eigen)?;
    let params = PhiParameterSet::new(weights, values, eigen)?;
    let total = params.exact_total()?;
    let result = params.evaluate()?;
    Ok(json!({
        "total": total.to_string(),
        "deltaGeom": result.delta_geom,
        "deltaProtocol": result.delta_protocol,
        "deltaTotal": result.delta_total,
    }))
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map_or_else(|| n.to_string(), |f| format!("{f:.4}")),
        other => other.to_string(),
    }
}
