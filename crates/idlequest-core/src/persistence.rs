//! Save/Load for engine state
//!
//! Saves hold only the values that change during play. Definitions (names,
//! costs, rewards, durations) always come from the current [`GameConfig`],
//! so content updates apply to old saves. Every persisted field is optional:
//! whatever survives is merged onto a new game and the rest is defaulted.
//! Loading never fails outright; the worst case is a fresh game with a
//! repair note in the log.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::components::{sanitize, ActionRuntime};
use crate::config::GameConfig;
use crate::state::{EngineState, LogEntry, LogKind, Snapshot};

/// Version number written into every save. All versions load; it is kept
/// for future migrations.
pub const SAVE_VERSION: u32 = 1;

/// Errors from the store and codec layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Encoding used by a [`SaveSlot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    /// Human-readable, tolerant of hand edits
    #[default]
    Json,
    /// Compact bincode
    Binary,
}

/// Persisted scalars of one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedResource {
    pub current: Option<f64>,
    pub max: Option<f64>,
    pub unlocked: Option<bool>,
}

/// Persisted scalars of one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedAction {
    pub unlocked: Option<bool>,
    pub progress: Option<f64>,
    pub completion_count: Option<u64>,
    pub last_start_ms: Option<u64>,
    pub paid: Option<bool>,
}

/// On-disk shape of a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub version: u32,
    pub timestamp_ms: u64,
    pub clock_ms: Option<u64>,
    pub current_action: Option<String>,
    pub previous_action: Option<String>,
    pub resources: BTreeMap<String, SavedResource>,
    pub actions: BTreeMap<String, SavedAction>,
    pub log: Vec<LogEntry>,
}

impl From<&Snapshot> for SaveData {
    fn from(snapshot: &Snapshot) -> Self {
        let state = &snapshot.state;
        let resources = state
            .resources
            .values()
            .map(|r| {
                let saved = SavedResource {
                    current: Some(r.current),
                    max: Some(r.max),
                    unlocked: Some(r.unlocked),
                };
                (r.id.clone(), saved)
            })
            .collect();
        let actions = state
            .catalog
            .ids()
            .map(|id| {
                let runtime = state.runtime(id);
                let saved = SavedAction {
                    unlocked: Some(state.catalog.is_unlocked(id)),
                    progress: Some(runtime.progress),
                    completion_count: Some(runtime.completion_count),
                    last_start_ms: runtime.last_start_ms,
                    paid: Some(runtime.paid),
                };
                (id.to_string(), saved)
            })
            .collect();

        Self {
            version: SAVE_VERSION,
            timestamp_ms: snapshot.timestamp_ms,
            clock_ms: Some(state.clock_ms),
            current_action: state.current_action.clone(),
            previous_action: state.previous_action.clone(),
            resources,
            actions,
            log: state.log.entries().cloned().collect(),
        }
    }
}

/// Serialize a snapshot in the given format.
pub fn encode(snapshot: &Snapshot, format: SaveFormat) -> Result<Vec<u8>, PersistenceError> {
    let data = SaveData::from(snapshot);
    let bytes = match format {
        SaveFormat::Json => serde_json::to_vec_pretty(&data)?,
        SaveFormat::Binary => bincode::serialize(&data)?,
    };
    Ok(bytes)
}

/// Rebuild a snapshot from saved bytes, repairing whatever is damaged.
///
/// Returns the repair notes alongside; an empty list means the save was
/// clean.
pub fn decode(bytes: &[u8], format: SaveFormat, config: &GameConfig) -> (Snapshot, Vec<String>) {
    let mut notes = Vec::new();
    let data = match format {
        SaveFormat::Json => decode_json(bytes, &mut notes),
        SaveFormat::Binary => match bincode::deserialize::<SaveData>(bytes) {
            Ok(data) => data,
            Err(e) => {
                notes.push(format!("unreadable save ({}); starting over", e));
                SaveData::default()
            }
        },
    };
    if data.version != SAVE_VERSION && notes.is_empty() {
        log::debug!(
            "loading save version {} (current {})",
            data.version,
            SAVE_VERSION
        );
    }

    let timestamp_ms = data.timestamp_ms;
    let (state, repair_notes) = repair(data, config);
    notes.extend(repair_notes);

    let mut snapshot = Snapshot {
        version: SAVE_VERSION,
        timestamp_ms,
        state,
    };
    if !notes.is_empty() {
        log::warn!("save repaired: {}", notes.join("; "));
        let now = snapshot.state.clock_ms;
        snapshot.state.log.push(
            now,
            LogKind::Repair,
            format!("Save data was damaged and has been repaired ({} issue(s))", notes.len()),
        );
    }
    (snapshot, notes)
}

/// Field-by-field JSON decode, so one bad field only costs that field.
fn decode_json(bytes: &[u8], notes: &mut Vec<String>) -> SaveData {
    let object = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            notes.push("save is not a JSON object; starting over".to_string());
            return SaveData::default();
        }
        Err(e) => {
            notes.push(format!("unreadable save ({}); starting over", e));
            return SaveData::default();
        }
    };

    SaveData {
        version: field(&object, "version", notes).unwrap_or_default(),
        timestamp_ms: field(&object, "timestamp_ms", notes).unwrap_or_default(),
        clock_ms: field(&object, "clock_ms", notes).flatten(),
        current_action: field(&object, "current_action", notes).flatten(),
        previous_action: field(&object, "previous_action", notes).flatten(),
        resources: entries(&object, "resources", notes),
        actions: entries(&object, "actions", notes),
        log: field::<Vec<Value>>(&object, "log", notes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str, notes: &mut Vec<String>) -> Option<T> {
    let value = object.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            notes.push(format!("field '{}' was unreadable", key));
            None
        }
    }
}

fn entries<T: DeserializeOwned>(
    object: &Map<String, Value>,
    key: &str,
    notes: &mut Vec<String>,
) -> BTreeMap<String, T> {
    let Some(map) = field::<Map<String, Value>>(object, key, notes) else {
        return BTreeMap::new();
    };
    map.into_iter()
        .filter_map(|(id, value)| match serde_json::from_value(value) {
            Ok(parsed) => Some((id, parsed)),
            Err(_) => {
                notes.push(format!("{} entry '{}' was unreadable", key, id));
                None
            }
        })
        .collect()
}

/// Merge saved scalars onto a new game built from `config`.
///
/// Non-finite numbers fall back to the new-game value, amounts are clamped
/// into range, and ids the config no longer knows are dropped. Unlocks are
/// one-way: a saved unlock survives, a saved lock does not relock.
pub fn repair(data: SaveData, config: &GameConfig) -> (EngineState, Vec<String>) {
    let mut notes = Vec::new();
    let clock_ms = data.clock_ms.unwrap_or(data.timestamp_ms);
    let mut state = EngineState::new_game(config, clock_ms);

    for (id, saved) in data.resources {
        let Some(resource) = state.resources.get_mut(&id) else {
            notes.push(format!("dropped unknown resource '{}'", id));
            continue;
        };
        if let Some(max) = saved.max {
            if max.is_finite() && max >= 0.0 {
                resource.max = max;
            } else {
                notes.push(format!("reset max of '{}'", id));
            }
        }
        match saved.current {
            Some(current) if current.is_finite() => {
                let clamped = current.clamp(0.0, resource.max);
                if clamped != current {
                    notes.push(format!("clamped '{}' into range", id));
                }
                resource.current = clamped;
            }
            Some(_) => {
                notes.push(format!("reset amount of '{}'", id));
                resource.current = resource.current.min(resource.max);
            }
            None => resource.current = resource.current.min(resource.max),
        }
        if saved.unlocked == Some(true) {
            resource.unlocked = true;
        }
    }

    for (id, saved) in data.actions {
        if !state.catalog.contains(&id) {
            notes.push(format!("dropped unknown action '{}'", id));
            continue;
        }
        if saved.unlocked == Some(true) {
            state.catalog.unlock(&id);
        }
        let mut runtime = ActionRuntime::default();
        if let Some(progress) = saved.progress {
            let clean = sanitize(progress).clamp(0.0, 1.0);
            if clean != progress {
                notes.push(format!("reset progress of '{}'", id));
            }
            runtime.progress = clean;
        }
        runtime.completion_count = saved.completion_count.unwrap_or(0);
        runtime.last_start_ms = saved.last_start_ms;
        // Progress past 0 implies the cycle was paid for
        runtime.paid = saved.paid.unwrap_or(false) || runtime.progress > 0.0;
        state.runtime.insert(id, runtime);
    }

    state.current_action = known_action(&state, data.current_action, "current", &mut notes);
    state.previous_action = known_action(&state, data.previous_action, "previous", &mut notes);
    if state.previous_action.is_some() && state.previous_action == state.current_action {
        state.previous_action = None;
    }

    for entry in data.log {
        state.log.push_entry(entry);
    }

    (state, notes)
}

fn known_action(
    state: &EngineState,
    id: Option<String>,
    role: &str,
    notes: &mut Vec<String>,
) -> Option<String> {
    let id = id?;
    if state.catalog.is_unlocked(&id) {
        Some(id)
    } else {
        notes.push(format!("cleared {} action '{}'", role, id));
        None
    }
}

/// Raw byte storage behind a save slot.
pub trait BlobStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// In-memory store, mostly for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bytes: Option<Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.bytes.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }
}

/// Single save file, replaced atomically via a sibling temp file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("save");
        let tmp_name = format!("{file_name}.tmp");
        match self.path.parent() {
            Some(parent) => parent.join(tmp_name),
            None => PathBuf::from(tmp_name),
        }
    }
}

impl BlobStore for FileStore {
    fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.temp_path();
        fs::write(&tmp_path, bytes)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// A store paired with an encoding. Failures are logged and reported as
/// `false`/`None`; the game keeps running either way.
#[derive(Debug, Clone)]
pub struct SaveSlot<S: BlobStore> {
    store: S,
    format: SaveFormat,
}

impl<S: BlobStore> SaveSlot<S> {
    pub fn new(store: S, format: SaveFormat) -> Self {
        Self { store, format }
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn save(&mut self, snapshot: &Snapshot) -> bool {
        let result = encode(snapshot, self.format).and_then(|bytes| self.store.write(&bytes));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("save failed: {}", e);
                false
            }
        }
    }

    /// `None` when the slot is empty or cannot be read at all.
    pub fn load(&self, config: &GameConfig) -> Option<Snapshot> {
        self.load_with_notes(config).map(|(snapshot, _)| snapshot)
    }

    /// Like [`load`](Self::load), also returning any repair notes.
    pub fn load_with_notes(&self, config: &GameConfig) -> Option<(Snapshot, Vec<String>)> {
        match self.store.read() {
            Ok(Some(bytes)) => Some(decode(&bytes, self.format, config)),
            Ok(None) => None,
            Err(e) => {
                log::error!("load failed: {}", e);
                None
            }
        }
    }
}
