#![forbid(unsafe_code)]

//! Host lifecycle driver.
//!
//! A host owns a [`Registry`] of containers and drives three events:
//!
//! | Event | Value | Set | Timer |
//! |-------|-------|-----|-------|
//! | `start` | `initialize` | `initialize` (links checked and wired) | `initialize` |
//! | `scene_reset` | `reset(false)` | `clear_to_initial` | value `reset(false)` |
//! | `validate_all` | `validate` | `validate` | value `validate` |
//!
//! Containers start in registration order. A set composes its initial
//! contents from its linked sets at start, so register supersets and bases
//! before the sets that link to them.

use std::fmt;

use statecell_core::ConfigError;
use tracing::{debug, error, info};

use crate::set::ObservableSet;
use crate::timer::CountdownTimer;
use crate::value::ObservableValue;

/// Whether the host is authoring or running when it reports an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditorMode {
    #[default]
    Editing,
    Playing,
}

/// A container the host can drive through its lifecycle.
pub trait Lifecycle {
    fn name(&self) -> String;

    /// First-time setup at start of play.
    fn initialize(&self) -> Result<(), ConfigError>;

    /// Scene changed: non-persistent containers return to their initial
    /// state.
    fn scene_reset(&self);

    /// The container's authoring-side fields were edited.
    fn validate(&self, mode: EditorMode);
}

impl<T: Clone + 'static> Lifecycle for ObservableValue<T> {
    fn name(&self) -> String {
        ObservableValue::name(self)
    }

    fn initialize(&self) -> Result<(), ConfigError> {
        ObservableValue::initialize(self);
        Ok(())
    }

    fn scene_reset(&self) {
        self.reset(false);
    }

    fn validate(&self, mode: EditorMode) {
        ObservableValue::validate(self, mode);
    }
}

impl<T: Clone + PartialEq + 'static> Lifecycle for ObservableSet<T> {
    fn name(&self) -> String {
        ObservableSet::name(self)
    }

    fn initialize(&self) -> Result<(), ConfigError> {
        ObservableSet::initialize(self)
    }

    fn scene_reset(&self) {
        self.clear_to_initial();
    }

    fn validate(&self, mode: EditorMode) {
        ObservableSet::validate(self, mode);
    }
}

impl Lifecycle for CountdownTimer {
    fn name(&self) -> String {
        self.value().name()
    }

    fn initialize(&self) -> Result<(), ConfigError> {
        CountdownTimer::initialize(self);
        Ok(())
    }

    fn scene_reset(&self) {
        self.value().reset(false);
    }

    fn validate(&self, mode: EditorMode) {
        self.value().validate(mode);
    }
}

/// Ordered collection of uniquely named containers.
#[derive(Default)]
pub struct Registry {
    containers: Vec<Box<dyn Lifecycle>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("containers", &self.names())
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container handle. Names must be unique.
    pub fn register(&mut self, container: impl Lifecycle + 'static) -> Result<(), ConfigError> {
        let name = container.name();
        if self.index_of(&name).is_some() {
            return Err(ConfigError::DuplicateName(name));
        }
        debug!(container = %name, "registered");
        self.containers.push(Box::new(container));
        Ok(())
    }

    /// Remove a container by name.
    pub fn unregister(&mut self, name: &str) -> Result<(), ConfigError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ConfigError::UnknownName(name.to_owned()))?;
        self.containers.remove(index);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Lifecycle> {
        self.index_of(name).map(|i| self.containers[i].as_ref())
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.containers.iter().map(|c| c.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Initialize every container in registration order. Stops at the first
    /// failure.
    pub fn start(&self) -> Result<(), ConfigError> {
        for container in &self.containers {
            if let Err(err) = container.initialize() {
                error!(container = %container.name(), error = %err, "initialization failed");
                return Err(err);
            }
        }
        info!(count = self.containers.len(), "registry started");
        Ok(())
    }

    /// Return every non-persistent container to its initial state.
    pub fn scene_reset(&self) {
        debug!(count = self.containers.len(), "scene reset");
        for container in &self.containers {
            container.scene_reset();
        }
    }

    pub fn validate_all(&self, mode: EditorMode) {
        for container in &self.containers {
            container.validate(mode);
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.containers.iter().position(|c| c.name() == name)
    }
}
