//! Record access embargo worker runtime.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use rdm_access_application::RecordAccessService;
use rdm_access_core::{AppError, AppResult};
use rdm_access_domain::{AccessConfig, today};
use rdm_access_infrastructure::{
    InMemoryAccessDirectory, InMemorySecretLinkRepository, JsonFileRecordRepository,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    records_path: String,
    sweep_interval_secs: u64,
    run_once: bool,
    dump_parent_grants: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let service = build_access_service(&config).await?;

    info!(
        records_path = %config.records_path,
        sweep_interval_secs = config.sweep_interval_secs,
        run_once = config.run_once,
        "rdm-access-worker started"
    );

    loop {
        let sweep_date = today();
        match service.lift_expired_embargoes(sweep_date).await {
            Ok(lifted) if lifted.is_empty() => {
                info!(date = %sweep_date, "no expired embargoes");
            }
            Ok(lifted) => {
                info!(
                    date = %sweep_date,
                    lifted_count = lifted.len(),
                    record_ids = ?lifted,
                    "lifted expired embargoes"
                );
            }
            Err(error) => {
                warn!(date = %sweep_date, error = %error, "embargo sweep failed");
            }
        }

        if config.run_once {
            return Ok(());
        }

        tokio::time::sleep(Duration::from_secs(config.sweep_interval_secs)).await;
    }
}

async fn build_access_service(config: &WorkerConfig) -> AppResult<RecordAccessService> {
    let directory = Arc::new(InMemoryAccessDirectory::new());
    let records = JsonFileRecordRepository::open(config.records_path.as_str()).await?;
    let access_config = AccessConfig {
        dump_parent_grants: config.dump_parent_grants,
        ..AccessConfig::default()
    };

    Ok(RecordAccessService::new(
        directory.clone(),
        directory,
        Arc::new(InMemorySecretLinkRepository::new()),
        Arc::new(records),
        access_config,
    ))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let records_path = required_env("RECORDS_PATH")?;
        let sweep_interval_secs = parse_env_u64("EMBARGO_SWEEP_INTERVAL_SECS", 3600)?;
        let run_once = parse_env_bool("EMBARGO_SWEEP_ONCE", false)?;
        let dump_parent_grants = parse_env_bool("ACCESS_DUMP_PARENT_GRANTS", false)?;

        if sweep_interval_secs == 0 {
            return Err(AppError::Validation(
                "EMBARGO_SWEEP_INTERVAL_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            records_path,
            sweep_interval_secs,
            run_once,
            dump_parent_grants,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(value.as_str()).ok_or_else(|| {
            AppError::Validation(format!("invalid {name} value '{value}': expected true or false"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn parses_boolean_flags() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
