//! Load tickets.
//!
//! Every load takes a ticket from a generation counter. Only the most
//! recently issued ticket may complete; anything older is stale and its
//! response is dropped.

use crate::pipeline::id::{PipelineId, VersionId};

/// How a loaded version is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Classify by identity (latest, published, other)
    Open,
    /// Explicit navigation to a snapshot; always read-only
    Historical,
    /// Reload of the version being edited, dropping local edits
    Reload,
}

/// Identifies one in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub(crate) generation: u64,
    pub pipeline_id: PipelineId,
    pub version_id: Option<VersionId>,
    pub mode: LoadMode,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Monotonic generation counter.
#[derive(Debug, Clone, Default)]
pub struct LoadGeneration {
    current: u64,
}

impl LoadGeneration {
    /// Issue a new ticket, superseding every earlier one.
    pub fn issue(
        &mut self,
        pipeline_id: PipelineId,
        version_id: Option<VersionId>,
        mode: LoadMode,
    ) -> LoadTicket {
        self.current += 1;
        LoadTicket {
            generation: self.current,
            pipeline_id,
            version_id,
            mode,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.current
    }

    /// Supersede in-flight loads without starting a new one.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes() {
        let mut generation = LoadGeneration::default();
        let first = generation.issue(1, None, LoadMode::Open);
        let second = generation.issue(1, Some(4), LoadMode::Historical);
        assert!(!generation.is_current(&first));
        assert!(generation.is_current(&second));
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_invalidate() {
        let mut generation = LoadGeneration::default();
        let ticket = generation.issue(1, None, LoadMode::Open);
        generation.invalidate();
        assert!(!generation.is_current(&ticket));
    }
}
