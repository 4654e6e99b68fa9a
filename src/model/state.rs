use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};

use crate::error::ApiResult;

pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct StoredState {
    pub state: String,
    pub last_changed: DateTime<Utc>,
}

/// Host-side entity state persistence.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last persisted state of `entity_id`, if any.
    async fn last_state(&self, entity_id: &str) -> Option<StoredState>;

    /// Request that the new state is published and persisted. Never blocks.
    fn schedule_update(&self, entity_id: &str, state: &str);
}

/// Entity states, persisted as a yaml map of entity id to [`StoredState`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RestoreState {
    pub file: Utf8PathBuf,
    pub states: BTreeMap<String, StoredState>,
}

impl RestoreState {
    pub fn load(file: Utf8PathBuf) -> ApiResult<Self> {
        let states = if file.is_file() {
            match File::open(&file).and_then(|fd| {
                serde_yml::from_reader::<_, BTreeMap<String, StoredState>>(fd)
                    .map_err(std::io::Error::other)
            }) {
                Ok(states) => states,
                Err(err) => {
                    log::warn!("Failed to parse {}, starting without saved state: {}", file, err);
                    BTreeMap::new()
                }
            }
        } else {
            log::debug!("No state file found at {file}");
            BTreeMap::new()
        };

        Ok(Self { file, states })
    }

    pub fn save(&self) -> ApiResult<()> {
        let file = File::create(&self.file)?;
        serde_yml::to_writer(file, &self.states)?;
        Ok(())
    }

    /// Record a new state. Returns `true` if the state changed.
    pub fn record(&mut self, entity_id: &str, state: &str) -> bool {
        if self
            .states
            .get(entity_id)
            .is_some_and(|old| old.state == state)
        {
            return false;
        }

        self.states.insert(
            entity_id.to_string(),
            StoredState {
                state: state.to_string(),
                last_changed: Utc::now(),
            },
        );
        true
    }
}

/// [`StateStore`] backed by a [`RestoreState`] file. Updates are queued, and
/// written by the matching [`StateWriter`].
#[derive(Clone)]
pub struct StateFile {
    inner: Arc<Mutex<RestoreState>>,
    tx: mpsc::UnboundedSender<(String, String)>,
}

pub struct StateWriter {
    inner: Arc<Mutex<RestoreState>>,
    rx: mpsc::UnboundedReceiver<(String, String)>,
}

impl StateFile {
    #[must_use]
    pub fn new(state: RestoreState) -> (Self, StateWriter) {
        let inner = Arc::new(Mutex::new(state));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: inner.clone(),
                tx,
            },
            StateWriter { inner, rx },
        )
    }
}

#[async_trait]
impl StateStore for StateFile {
    async fn last_state(&self, entity_id: &str) -> Option<StoredState> {
        self.inner.lock().await.states.get(entity_id).cloned()
    }

    fn schedule_update(&self, entity_id: &str, state: &str) {
        if self
            .tx
            .send((entity_id.to_string(), state.to_string()))
            .is_err()
        {
            log::warn!("State writer stopped, dropping update of {entity_id} to {state:?}");
        }
    }
}

impl StateWriter {
    /// Handle a single queued update. Returns `false` once every
    /// [`StateFile`] handle is gone.
    pub async fn step(&mut self) -> ApiResult<bool> {
        let Some((entity_id, state)) = self.rx.recv().await else {
            return Ok(false);
        };

        let mut lock = self.inner.lock().await;
        if lock.record(&entity_id, &state) {
            log::debug!("Saving state of {entity_id}: {state}");
            lock.save()?;
        }
        drop(lock);

        Ok(true)
    }

    pub async fn run(mut self) -> ApiResult<()> {
        loop {
            match self.step().await {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => log::error!("Failed to save entity state: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use crate::model::state::{RestoreState, STATE_OFF, STATE_ON, StateFile, StateStore};

    fn state_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("state.yaml")).unwrap()
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = RestoreState::load(state_path(&dir)).unwrap();
        assert!(state.states.is_empty());
    }

    #[test]
    fn load_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(&path, "[[[ not yaml").unwrap();

        let state = RestoreState::load(path).unwrap();
        assert!(state.states.is_empty());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let mut state = RestoreState::load(path.clone()).unwrap();
        assert!(state.record("switch.hue_circadian_circadian_hue", STATE_ON));
        state.save().unwrap();

        let loaded = RestoreState::load(path).unwrap();
        assert_eq!(loaded.states, state.states);
    }

    #[test]
    fn record_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = RestoreState::load(state_path(&dir)).unwrap();

        assert!(state.record("switch.a", STATE_OFF));
        let first = state.states["switch.a"].last_changed;
        assert!(!state.record("switch.a", STATE_OFF));
        assert_eq!(state.states["switch.a"].last_changed, first);
        assert!(state.record("switch.a", STATE_ON));
    }

    #[tokio::test]
    async fn writer_persists_scheduled_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let (store, mut writer) = StateFile::new(RestoreState::load(path.clone()).unwrap());
        assert!(store.last_state("switch.a").await.is_none());

        store.schedule_update("switch.a", STATE_ON);
        assert!(writer.step().await.unwrap());

        assert_eq!(store.last_state("switch.a").await.unwrap().state, STATE_ON);
        let loaded = RestoreState::load(path).unwrap();
        assert_eq!(loaded.states["switch.a"].state, STATE_ON);

        drop(store);
        assert!(!writer.step().await.unwrap());
    }
}
