use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::placements::domain::PlacementId;
use super::record::GovernanceRecord;

/// Durable map of governance records keyed by placement id.
///
/// Writes are compare-and-swap on the record version so racing staff sessions cannot
/// silently overwrite each other. An absent record has version zero.
pub trait GovernanceStore: Send + Sync {
    fn fetch(&self, id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError>;

    /// Persist `record` only if the stored version still equals `expected_version`.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError>;

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError>;

    /// Insert every record whose id is not stored yet, leaving existing records untouched.
    /// Returns how many were inserted. Stores with costly writes should override this to
    /// commit the whole batch at once.
    fn insert_missing(&self, records: Vec<GovernanceRecord>) -> Result<usize, GovernanceStoreError> {
        let mut inserted = 0;
        for record in records {
            match self.compare_and_swap(0, record) {
                Ok(_) => inserted += 1,
                Err(GovernanceStoreError::VersionConflict { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(inserted)
    }
}

/// Error enumeration for governance storage failures.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceStoreError {
    #[error(
        "governance record for {placement_id} changed concurrently \
         (expected version {expected}, found {found})"
    )]
    VersionConflict {
        placement_id: PlacementId,
        expected: u64,
        found: u64,
    },
    #[error("governance store unavailable: {0}")]
    Unavailable(String),
    #[error("governance store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("governance store contains invalid data: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn check_version(
    current: Option<&GovernanceRecord>,
    expected_version: u64,
    placement_id: &PlacementId,
) -> Result<(), GovernanceStoreError> {
    let found = current.map_or(0, |record| record.version);
    if found == expected_version {
        Ok(())
    } else {
        Err(GovernanceStoreError::VersionConflict {
            placement_id: placement_id.clone(),
            expected: expected_version,
            found,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, GovernanceStoreError> {
    mutex
        .lock()
        .map_err(|_| GovernanceStoreError::Unavailable("governance store lock poisoned".into()))
}

/// Process-local store. State is lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryGovernanceStore {
    records: Mutex<HashMap<PlacementId, GovernanceRecord>>,
}

impl InMemoryGovernanceStore {
    pub fn with_records(records: impl IntoIterator<Item = GovernanceRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.placement_id.clone(), record))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

impl GovernanceStore for InMemoryGovernanceStore {
    fn fetch(&self, id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError> {
        let mut guard = lock(&self.records)?;
        check_version(
            guard.get(&record.placement_id),
            expected_version,
            &record.placement_id,
        )?;
        guard.insert(record.placement_id.clone(), record.clone());
        Ok(record)
    }

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError> {
        Ok(lock(&self.records)?.clone())
    }

    fn insert_missing(&self, records: Vec<GovernanceRecord>) -> Result<usize, GovernanceStoreError> {
        let mut guard = lock(&self.records)?;
        let mut inserted = 0;
        for record in records {
            if !guard.contains_key(&record.placement_id) {
                guard.insert(record.placement_id.clone(), record);
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

/// Store persisted as a JSON array, loaded once at session start.
///
/// Every accepted write rewrites the file through a temporary sibling and a rename so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileGovernanceStore {
    path: PathBuf,
    records: Mutex<BTreeMap<PlacementId, GovernanceRecord>>,
}

impl JsonFileGovernanceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GovernanceStoreError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let stored: Vec<GovernanceRecord> = serde_json::from_reader(reader)?;
            stored
                .into_iter()
                .map(|record| (record.placement_id.clone(), record))
                .collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(
        &self,
        records: &BTreeMap<PlacementId, GovernanceRecord>,
    ) -> Result<(), GovernanceStoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staging = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, &records.values().collect::<Vec<_>>())?;
            writer.flush()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl GovernanceStore for JsonFileGovernanceStore {
    fn fetch(&self, id: &PlacementId) -> Result<Option<GovernanceRecord>, GovernanceStoreError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: GovernanceRecord,
    ) -> Result<GovernanceRecord, GovernanceStoreError> {
        let mut guard = lock(&self.records)?;
        check_version(
            guard.get(&record.placement_id),
            expected_version,
            &record.placement_id,
        )?;

        let mut next = guard.clone();
        next.insert(record.placement_id.clone(), record.clone());
        self.persist(&next)?;
        *guard = next;
        Ok(record)
    }

    fn snapshot(&self) -> Result<HashMap<PlacementId, GovernanceRecord>, GovernanceStoreError> {
        Ok(lock(&self.records)?
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }

    /// One file rewrite for the whole batch; none when every id is already stored.
    fn insert_missing(&self, records: Vec<GovernanceRecord>) -> Result<usize, GovernanceStoreError> {
        let mut guard = lock(&self.records)?;
        let mut next = guard.clone();
        let mut inserted = 0;
        for record in records {
            if !next.contains_key(&record.placement_id) {
                next.insert(record.placement_id.clone(), record);
                inserted += 1;
            }
        }

        if inserted > 0 {
            self.persist(&next)?;
            *guard = next;
        }
        Ok(inserted)
    }
}
