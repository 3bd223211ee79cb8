//! Pipeline stage machine.
//!
//! One invocation walks this graph:
//!
//! ```text
//! start -> normalizing-date -> generating-todos -> calling-generation-service
//!       -> (success | fallback) -> enriching-vendors -> sanitizing
//!       -> persisting -> done
//! start      -> error   (input validation)
//! persisting -> error
//! ```

use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Start,
    NormalizingDate,
    GeneratingTodos,
    CallingGenerationService,
    Success,
    Fallback,
    EnrichingVendors,
    Sanitizing,
    Persisting,
    Done,
    Error,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::NormalizingDate => "normalizing-date",
            Self::GeneratingTodos => "generating-todos",
            Self::CallingGenerationService => "calling-generation-service",
            Self::Success => "success",
            Self::Fallback => "fallback",
            Self::EnrichingVendors => "enriching-vendors",
            Self::Sanitizing => "sanitizing",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Check whether `from -> to` is an edge of the stage graph.
    pub fn is_valid_transition(from: Self, to: Self) -> bool {
        use PipelineStage::*;
        matches!(
            (from, to),
            (Start, NormalizingDate)
                | (Start, Error)
                | (NormalizingDate, GeneratingTodos)
                | (GeneratingTodos, CallingGenerationService)
                | (CallingGenerationService, Success)
                | (CallingGenerationService, Fallback)
                | (Success, EnrichingVendors)
                | (Fallback, EnrichingVendors)
                | (EnrichingVendors, Sanitizing)
                | (Sanitizing, Persisting)
                | (Persisting, Done)
                | (Persisting, Error)
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid pipeline transition: {from} -> {to}")]
pub struct StageError {
    pub from: PipelineStage,
    pub to: PipelineStage,
}

/// Tracks the current stage of one invocation and logs each move.
#[derive(Debug)]
pub struct StageTracker {
    run_id: Uuid,
    user_id: String,
    current: PipelineStage,
}

impl StageTracker {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_id: user_id.into(),
            current: PipelineStage::Start,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn advance(&mut self, to: PipelineStage) -> Result<(), StageError> {
        let from = self.current;
        if !PipelineStage::is_valid_transition(from, to) {
            return Err(StageError { from, to });
        }
        tracing::debug!(
            run_id = %self.run_id,
            user_id = %self.user_id,
            from = %from,
            to = %to,
            "pipeline stage"
        );
        self.current = to;
        Ok(())
    }
}
