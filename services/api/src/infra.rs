use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use wil_risk::config::{AppConfig, RiskEngineConfig};
use wil_risk::placements::{
    FairnessAuditor, GovernanceRecord, GovernanceStore, GovernanceStoreError,
    InMemoryGovernanceStore, JsonFileGovernanceStore, PlacementId, PlacementReviewService,
    RiskScorer,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Governance backend selected at startup.
pub(crate) enum ConfiguredStore {
    Memory(InMemoryGovernanceStore),
    File(JsonFileGovernanceStore),
}

impl ConfiguredStore {
    pub(crate) fn open(path: Option<&Path>) -> Result<Self, GovernanceStoreError> {
        match path {
            Some(path) => {
                let store = JsonFileGovernanceStore::open(path)?;
                info!(path = %path.display(), "governance records loaded from file");
                Ok(Self::File(store))
            }
            None => {
                info!("governance records held in memory for this session");
                Ok(Self::Memory(InMemoryGovernanceStore::default()))
            }
        }
    }
}

impl GovernanceStore for ConfiguredStore {
    fn fetch(&self, id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError> {
        match self {
            Self::Memory(store) => store.fetch(id),
            Self::File(store) => store.fetch(id),
        }
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError> {
        match self {
            Self::Memory(store) => store.compare_and_swap(expected_version, record),
            Self::File(store) => store.compare_and_swap(expected_version, record),
        }
    }

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError> {
        match self {
            Self::Memory(store) => store.snapshot(),
            Self::File(store) => store.snapshot(),
        }
    }

    fn insert_missing(&self, records: Vec<GovernanceRecord>) -> Result<usize, GovernanceStoreError> {
        match self {
            Self::Memory(store) => store.insert_missing(records),
            Self::File(store) => store.insert_missing(records),
        }
    }
}

pub(crate) fn review_service<S: GovernanceStore>(
    risk: &RiskEngineConfig,
    store: Arc<S>,
) -> Arc<PlacementReviewService<S>> {
    Arc::new(PlacementReviewService::new(
        store,
        RiskScorer::new(risk.scoring.clone()),
        FairnessAuditor::new(risk.disparity_alert_points),
    ))
}

/// Store path from the command line, falling back to `GOVERNANCE_STORE_PATH`.
pub(crate) fn store_path<'a>(
    override_path: Option<&'a Path>,
    config: &'a AppConfig,
) -> Option<&'a Path> {
    override_path.or(config.governance.store_path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wil_risk::config::{AppEnvironment, GovernanceConfig, ServerConfig, TelemetryConfig};

    fn config(store_path: Option<&str>) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            risk: RiskEngineConfig::default(),
            governance: GovernanceConfig {
                store_path: store_path.map(Into::into),
            },
        }
    }

    #[test]
    fn command_line_path_overrides_configured_path() {
        let config = config(Some("/srv/wil/governance.json"));
        let cli = Path::new("/tmp/override.json");

        assert_eq!(store_path(Some(cli), &config), Some(cli));
        assert_eq!(
            store_path(None, &config),
            Some(Path::new("/srv/wil/governance.json"))
        );
        assert_eq!(store_path(None, &self::config(None)), None);
    }

    #[test]
    fn missing_path_opens_memory_store() {
        let store = ConfiguredStore::open(None).expect("memory store");
        assert!(matches!(store, ConfiguredStore::Memory(_)));
        assert!(store.snapshot().expect("snapshot").is_empty());
    }

    #[test]
    fn file_store_batches_new_flags_into_one_write() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("governance.json");
        let store = ConfiguredStore::open(Some(path.as_path())).expect("file store");
        let records: Vec<_> = ["P-1", "P-2", "P-3"]
            .into_iter()
            .map(|id| {
                let mut record = GovernanceRecord::initial(PlacementId::new(id));
                record.version = 1;
                record
            })
            .collect();

        assert_eq!(store.insert_missing(records.clone()).expect("insert"), 3);
        assert_eq!(store.insert_missing(records).expect("insert again"), 0);

        let reopened = ConfiguredStore::open(Some(path.as_path())).expect("reopen");
        assert_eq!(reopened.snapshot().expect("snapshot").len(), 3);
    }
}
