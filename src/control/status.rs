//! Operator status light

use std::fmt;

/// Lifecycle state shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No persona has been written yet
    NoConfig,
    /// Assistant launch requested
    Started,
    /// Persona on disk, assistant not running
    Updated,
    /// Persona committed, waiting for the assistant to apply it
    Updating,
    /// Assistant running with the current persona
    Running,
}

/// Indicator color for a [`Status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Light {
    Red,
    Amber,
    Green,
}

impl Status {
    #[must_use]
    pub const fn light(self) -> Light {
        match self {
            Self::NoConfig => Light::Red,
            Self::Started | Self::Updated | Self::Updating => Light::Amber,
            Self::Running => Light::Green,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoConfig => "no config",
            Self::Started => "started",
            Self::Updated => "updated",
            Self::Updating => "updating",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Amber => "amber",
            Self::Green => "green",
        })
    }
}

/// Tracks [`Status`] across console and process events
#[derive(Debug, Clone)]
pub struct StatusIndicator {
    status: Status,
}

impl StatusIndicator {
    /// Start at `Updated` if a persona file already exists, else `NoConfig`
    #[must_use]
    pub const fn new(has_config: bool) -> Self {
        Self {
            status: if has_config {
                Status::Updated
            } else {
                Status::NoConfig
            },
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn light(&self) -> Light {
        self.status.light()
    }

    /// Launch of the assistant process was requested
    pub fn launched(&mut self) {
        self.set(Status::Started);
    }

    /// Assistant process is up
    pub fn process_running(&mut self) {
        self.set(Status::Running);
    }

    /// Assistant process exited or was stopped
    pub fn process_stopped(&mut self) {
        self.set(Status::Updated);
    }

    /// Persona written to disk
    pub fn committed(&mut self) {
        self.set(Status::Updating);
    }

    /// Assistant reported installing a persona
    pub fn config_applied(&mut self) {
        if matches!(self.status, Status::Updating | Status::Started) {
            self.set(Status::Running);
        }
    }

    fn set(&mut self, status: Status) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "status changed");
            self.status = status;
        }
    }
}
