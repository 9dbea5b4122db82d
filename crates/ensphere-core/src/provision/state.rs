//! Provisioning state machine
//!
//! One `ProvisionContext` exists per target. It owns the current stage and
//! only allows moving to the next stage of the tier's sequence, or to
//! `Failed` through the single abort path.
//!
//! ```text
//! NotStarted -> Fetched -> Relocated -> Templated -> Installed
//!     -> KeyGenerated -> Updated -> Rebranded -> Published
//!     -> Seeded (back only) -> Completed
//!
//! (any non-terminal stage can move to Failed)
//! ```

use super::target::Position;
use std::fmt;
use thiserror::Error;

/// Provisioning stages in sequential order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionStage {
    NotStarted,
    /// Template archive downloaded and extracted
    Fetched,
    /// Extracted root moved to `<app>-<position>`
    Relocated,
    /// `composer.json` and `.env.example` written
    Templated,
    /// Dependencies installed with scripts disabled
    Installed,
    /// `.env` created and application key generated
    KeyGenerated,
    /// Dependencies updated with the pinned modules
    Updated,
    /// Vendor and module names rewritten to the application name
    Rebranded,
    /// Module install assets published
    Published,
    /// Admin user and default site created (back only)
    Seeded,
    Completed,
    Failed,
}

impl ProvisionStage {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Next stage for the given tier, or `None` at a terminal stage
    pub const fn next(self, position: Position) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Fetched),
            Self::Fetched => Some(Self::Relocated),
            Self::Relocated => Some(Self::Templated),
            Self::Templated => Some(Self::Installed),
            Self::Installed => Some(Self::KeyGenerated),
            Self::KeyGenerated => Some(Self::Updated),
            Self::Updated => Some(Self::Rebranded),
            Self::Rebranded => Some(Self::Published),
            Self::Published => match position {
                Position::Back => Some(Self::Seeded),
                Position::Front => Some(Self::Completed),
            },
            Self::Seeded => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Full sequence for a tier, excluding `NotStarted` and `Failed`
    pub fn sequence(position: Position) -> Vec<Self> {
        let mut stages = Vec::new();
        let mut stage = Self::NotStarted;
        while let Some(next) = stage.next(position) {
            stages.push(next);
            stage = next;
        }
        stages
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Fetched => "Fetching template",
            Self::Relocated => "Moving template into place",
            Self::Templated => "Writing manifest and environment",
            Self::Installed => "Installing dependencies",
            Self::KeyGenerated => "Generating application key",
            Self::Updated => "Updating dependencies",
            Self::Rebranded => "Renaming vendor and module",
            Self::Published => "Publishing module assets",
            Self::Seeded => "Creating admin user and site",
            Self::Completed => "Provisioning complete",
            Self::Failed => "Provisioning failed",
        }
    }
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot move from '{from}' to '{to}' while provisioning the {position} application")]
    OutOfOrder {
        position: Position,
        from: ProvisionStage,
        to: ProvisionStage,
    },

    #[error("Cannot leave terminal stage '{from}'")]
    FromTerminalState { from: ProvisionStage },
}

/// Stage tracker for a single target
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    position: Position,
    current: ProvisionStage,
    failed_at: Option<ProvisionStage>,
    history: Vec<ProvisionStage>,
}

impl ProvisionContext {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            current: ProvisionStage::NotStarted,
            failed_at: None,
            history: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn current_stage(&self) -> ProvisionStage {
        self.current
    }

    /// Last stage reached before the failure, if the target failed
    pub fn failed_at(&self) -> Option<ProvisionStage> {
        self.failed_at
    }

    /// Stages reached so far, in order
    pub fn history(&self) -> &[ProvisionStage] {
        &self.history
    }

    pub fn is_complete(&self) -> bool {
        self.current == ProvisionStage::Completed
    }

    /// Stage that would be entered by the next `advance`
    pub fn upcoming(&self) -> Option<ProvisionStage> {
        self.current.next(self.position)
    }

    /// Move to the next stage in the tier's sequence
    pub fn advance(&mut self) -> Result<ProvisionStage, TransitionError> {
        let next = self
            .upcoming()
            .ok_or(TransitionError::FromTerminalState { from: self.current })?;
        self.enter(next);
        Ok(next)
    }

    /// Move to `stage`, which must be the next one in the sequence
    pub fn transition_to(&mut self, stage: ProvisionStage) -> Result<(), TransitionError> {
        if self.current.is_terminal() {
            return Err(TransitionError::FromTerminalState { from: self.current });
        }
        if self.upcoming() != Some(stage) {
            return Err(TransitionError::OutOfOrder {
                position: self.position,
                from: self.current,
                to: stage,
            });
        }
        self.enter(stage);
        Ok(())
    }

    /// Abort the target; the stage reached so far is kept for diagnostics
    pub fn fail(&mut self) {
        if self.current.is_terminal() {
            return;
        }
        self.failed_at = Some(self.current);
        self.current = ProvisionStage::Failed;
    }

    fn enter(&mut self, stage: ProvisionStage) {
        tracing::debug!(position = %self.position, from = ?self.current, to = ?stage, "stage transition");
        self.history.push(stage);
        self.current = stage;
    }
}
