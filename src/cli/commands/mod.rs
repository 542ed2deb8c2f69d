//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod nft;
pub mod particles;
pub mod phi;
pub mod rarity;
pub mod version;
pub mod watch;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use ethereum_types::U256;
use serde::Serialize;

use crate::cli::Shutdown;
use crate::cli::args::{Cli, Commands, NftSubcommand, OutputFormat, PhiSubcommand, SourceArgs};
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::config::schema::AppConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, PhiError, SkyntError};

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// One-shot commands are abandoned when `shutdown` fires; `watch` observes
/// it and stops gracefully.
///
/// # Errors
///
/// Returns an error if configuration cannot be resolved or the dispatched
/// command handler fails.
pub async fn dispatch(cli: Cli, shutdown: Shutdown) -> Result<(), SkyntError> {
    match cli.command {
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
        Commands::Phi(cmd) => match cmd.subcommand {
            PhiSubcommand::Compute(args) => phi::compute(&args),
            PhiSubcommand::Current(args) => {
                let config = resolve_config(cli.config.as_deref(), &cli.source)?;
                interruptible(&shutdown, phi::current(&config, &args)).await
            }
            PhiSubcommand::Details(args) => {
                let config = resolve_config(cli.config.as_deref(), &cli.source)?;
                interruptible(&shutdown, phi::details(&config, &args)).await
            }
        },
        Commands::Rarity(args) => rarity::run(&args),
        Commands::Nft(cmd) => {
            let config = resolve_config(cli.config.as_deref(), &cli.source)?;
            let fut = async {
                match &cmd.subcommand {
                    NftSubcommand::List(args) => nft::list(&config, args).await,
                    NftSubcommand::Get(args) => nft::get(&config, args).await,
                    NftSubcommand::Rarity(args) => nft::rarity(&config, args).await,
                    NftSubcommand::Distribution(args) => nft::distribution(&config, args).await,
                }
            };
            interruptible(&shutdown, fut).await
        }
        Commands::Particles(args) => {
            let config = resolve_config(cli.config.as_deref(), &cli.source)?;
            interruptible(&shutdown, particles::run(&config, &args)).await
        }
        Commands::Watch(args) => {
            let config = resolve_config(cli.config.as_deref(), &cli.source)?;
            watch::run(&config, &args, &shutdown).await
        }
    }
}

/// Runs `fut` unless shutdown is requested first.
async fn interruptible<F>(shutdown: &Shutdown, fut: F) -> Result<(), SkyntError>
where
    F: Future<Output = Result<(), SkyntError>>,
{
    tokio::select! {
        result = fut => result,
        reason = shutdown.cancelled() => {
            tracing::debug!(?reason, "command abandoned");
            Ok(())
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Loads the configuration file (defaults when absent) and applies the
/// command-line source overrides on top.
///
/// # Errors
///
/// Returns [`SkyntError::Config`] if the file cannot be loaded or the
/// overridden configuration fails validation.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &SourceArgs,
) -> Result<Arc<AppConfig>, SkyntError> {
    let base = if let Some(path) = path {
        tracing::info!(config = %path.display(), "loading configuration");
        let loader = ConfigLoader::new(LoaderOptions::default());
        let load_result = loader.load(path)?;

        for warning in &load_result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }
        load_result.config
    } else {
        Arc::new(AppConfig::default())
    };

    if !has_overrides(overrides) {
        return Ok(base);
    }

    let mut config = Arc::unwrap_or_clone(base);
    if let Some(kind) = overrides.kind {
        config.source.kind = kind;
    }
    if let Some(url) = &overrides.rpc_url {
        config.source.rpc_url = Some(url.clone());
    }
    if let Some(deployment) = &overrides.deployment {
        config.source.deployment_file.clone_from(deployment);
    }
    if overrides.no_fallback {
        config.source.fallback_to_mock = false;
    }

    let result = Validator::new().validate(&config);
    if result.has_errors() {
        return Err(ConfigError::ValidationError {
            path: "<command line>".to_string(),
            errors: result.errors,
        }
        .into());
    }
    Ok(Arc::new(config))
}

const fn has_overrides(overrides: &SourceArgs) -> bool {
    overrides.kind.is_some()
        || overrides.rpc_url.is_some()
        || overrides.deployment.is_some()
        || overrides.no_fallback
}

// ============================================================================
// Output and argument helpers
// ============================================================================

/// Prints `value` as pretty JSON, or runs `human` to print it as text.
///
/// # Errors
///
/// Returns [`SkyntError::Json`] if serialization fails.
pub(crate) fn emit<T, H>(format: OutputFormat, value: &T, human: H) -> Result<(), SkyntError>
where
    T: Serialize,
    H: FnOnce(&T),
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Human => human(value),
    }
    Ok(())
}

/// Parses one decimal number given on the command line.
///
/// Unparseable input is a usage error; negative and non-finite numbers are
/// passed through for the engine to reject.
pub(crate) fn parse_f64(flag: &str, raw: &str) -> Result<f64, SkyntError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| SkyntError::Usage(format!("invalid number '{raw}' for --{flag}")))
}

/// Parses a list of decimal numbers with [`parse_f64`].
pub(crate) fn parse_f64_list(flag: &str, raw: &[String]) -> Result<Vec<f64>, SkyntError> {
    raw.iter().map(|s| parse_f64(flag, s)).collect()
}

/// Parses one non-negative integer given on the command line.
///
/// A leading `-` is reported as [`PhiError::Negative`] for `field` at
/// `index`.
pub(crate) fn parse_u256(
    flag: &str,
    field: &'static str,
    index: usize,
    raw: &str,
) -> Result<U256, SkyntError> {
    let s = raw.trim();
    if s.starts_with('-') {
        return Err(PhiError::Negative {
            field,
            index,
            value: s.to_string(),
        }
        .into());
    }
    U256::from_dec_str(s).map_err(|_| {
        SkyntError::Usage(format!("invalid integer '{s}' for --{flag}; --exact takes whole numbers"))
    })
}

/// Parses a list of non-negative integers with [`parse_u256`].
pub(crate) fn parse_u256_list(
    flag: &str,
    field: &'static str,
    raw: &[String],
) -> Result<Vec<U256>, SkyntError> {
    raw.iter()
        .enumerate()
        .map(|(index, s)| parse_u256(flag, field, index, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::schema::SourceKind;
    use crate::error::ExitCode;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn defaults_without_file_or_overrides() {
        let config = resolve_config(None, &SourceArgs::default()).unwrap();
        assert_eq!(*config, AppConfig::default());
    }

    #[test]
    fn overrides_apply_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source:\n  kind: mock\nmock:\n  seed: 7").unwrap();

        let overrides = SourceArgs {
            kind: Some(SourceKind::Contract),
            rpc_url: Some("http://127.0.0.1:8545".into()),
            deployment: None,
            no_fallback: true,
        };
        let config = resolve_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.source.kind, SourceKind::Contract);
        assert_eq!(config.source.rpc_url(), Some("http://127.0.0.1:8545"));
        assert!(!config.source.fallback_to_mock);
        assert_eq!(config.mock.seed, 7);
    }

    #[test]
    fn invalid_override_is_config_error() {
        let overrides = SourceArgs {
            rpc_url: Some("ftp://node".into()),
            ..SourceArgs::default()
        };
        let err = resolve_config(None, &overrides).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn f64_list_rejects_garbage() {
        assert_eq!(
            parse_f64_list("weights", &strings(&["1", " 2.5", "-3"])).unwrap(),
            vec![1.0, 2.5, -3.0]
        );
        let err = parse_f64_list("weights", &strings(&["abc"])).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::USAGE_ERROR);
    }

    #[test]
    fn u256_list_reports_negative_as_invalid_input() {
        let err = parse_u256_list("values", "values", &strings(&["1", "-2"])).unwrap_err();
        assert!(matches!(
            err,
            SkyntError::Phi(PhiError::Negative { field: "values", index: 1, .. })
        ));
        assert_eq!(err.exit_code(), ExitCode::INPUT_ERROR);
    }

    #[test]
    fn scalar_parsers_trim_and_classify() {
        assert!((parse_f64("phi", " 1500 ").unwrap() - 1500.0).abs() < f64::EPSILON);
        assert_eq!(
            parse_f64("phi", "x").unwrap_err().exit_code(),
            ExitCode::USAGE_ERROR
        );

        assert_eq!(parse_u256("supply", "supply", 0, " 9 ").unwrap(), U256::from(9u64));
        let err = parse_u256("supply", "supply", 0, "-1").unwrap_err();
        assert!(matches!(
            err,
            SkyntError::Phi(PhiError::Negative { field: "supply", index: 0, .. })
        ));
        assert_eq!(
            parse_u256("supply", "supply", 0, "nine").unwrap_err().exit_code(),
            ExitCode::USAGE_ERROR
        );
    }

    #[test]
    fn u256_list_rejects_fractions() {
        let err = parse_u256_list("values", "values", &strings(&["1.5"])).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::USAGE_ERROR);
    }

    #[tokio::test]
    async fn interruptible_returns_on_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.trigger(crate::observability::StopReason::Interrupted);
        let result = interruptible(&shutdown, std::future::pending::<Result<(), SkyntError>>()).await;
        assert!(result.is_ok());
    }
}
