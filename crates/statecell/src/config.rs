#![forbid(unsafe_code)]

//! Construction-time configuration for containers.
//!
//! These are the authoring-side fields of a container: what an inspector
//! would show. Live state never round-trips through them.

use std::time::Duration;

use statecell_core::Roles;

/// Configuration for an [`ObservableValue`](crate::ObservableValue).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueConfig<T> {
    /// Container name, used in logs and errors.
    pub name: String,
    /// Value restored on reset.
    pub initial: T,
    /// Whether the value survives scene resets. Default: true.
    pub persistent: bool,
    /// Roles the value is visible to. Default: none (ungated).
    #[cfg_attr(feature = "serde", serde(default))]
    pub visibility: Roles,
    /// Free-form note for authors. No mechanical effect.
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
}

impl<T> ValueConfig<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            name: name.into(),
            initial,
            persistent: true,
            visibility: Roles::empty(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Roles) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Configuration for an [`ObservableSet`](crate::ObservableSet).
///
/// Relationships to other sets are live handles and are attached on the set
/// itself, not here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetConfig<T> {
    pub name: String,
    /// Seed elements, in order.
    #[cfg_attr(feature = "serde", serde(default = "Vec::new"))]
    pub initial: Vec<T>,
    /// Default: true.
    pub persistent: bool,
    /// When this set is a subset, start with the superset's contents.
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_full: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub visibility: Roles,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
}

impl<T> SetConfig<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: Vec::new(),
            persistent: true,
            start_full: false,
            visibility: Roles::empty(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_initial(mut self, initial: impl IntoIterator<Item = T>) -> Self {
        self.initial = initial.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    #[must_use]
    pub fn with_start_full(mut self, start_full: bool) -> Self {
        self.start_full = start_full;
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Roles) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Configuration for a [`CountdownTimer`](crate::CountdownTimer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimerConfig {
    /// Amount subtracted from the value on each tick. Default: 1.
    pub step: i64,
    /// Time between ticks. Default: 1s.
    pub tick_length: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            step: 1,
            tick_length: Duration::from_secs(1),
        }
    }
}

impl TimerConfig {
    #[must_use]
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    #[must_use]
    pub fn with_tick_length(mut self, tick_length: Duration) -> Self {
        self.tick_length = tick_length;
        self
    }
}
