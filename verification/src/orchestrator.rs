//! Stage orchestrator: sequences the wizard stages and owns the verification
//! record.
//!
//! Pure state: no I/O, no timers. Resource hand-over between stages is the
//! job of [`crate::Wizard`], which wraps this type.

use ekyc_types::{Stage, StageOutput, VerificationRecord};
use serde::{Deserialize, Serialize};

use crate::error::VerificationError;

/// Events emitted by the orchestrator for the caller to process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WizardEvent {
    /// A stage became active.
    StageEntered { stage: Stage, from: Option<Stage> },
    /// A completed stage's output was merged into the record.
    RecordMerged { stage: Stage },
    /// The record was cleared and the wizard returned to the first stage.
    WizardReset { from: Stage },
}

/// Owns the active stage and the accumulated [`VerificationRecord`].
#[derive(Debug)]
pub struct StageOrchestrator {
    stage: Stage,
    record: VerificationRecord,
    /// Every stage entered since the last reset, oldest first.
    history: Vec<Stage>,
    pending_events: Vec<WizardEvent>,
}

impl Default for StageOrchestrator {
    fn default() -> Self {
        Self {
            stage: Stage::DocumentUpload,
            record: VerificationRecord::new(),
            history: vec![Stage::DocumentUpload],
            pending_events: vec![WizardEvent::StageEntered {
                stage: Stage::DocumentUpload,
                from: None,
            }],
        }
    }
}

impl StageOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn record(&self) -> &VerificationRecord {
        &self.record
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Move forward with the output of the active stage.
    ///
    /// The output must come from the active stage and satisfy its completion
    /// predicate. On success it is merged into the record.
    pub fn advance(&mut self, output: StageOutput) -> Result<Stage, VerificationError> {
        let Some(next) = self.stage.next() else {
            return Err(VerificationError::InvalidTransition {
                stage: self.stage,
                action: "advance",
            });
        };
        if output.stage() != self.stage {
            return Err(VerificationError::StageMismatch {
                expected: self.stage,
                actual: output.stage(),
            });
        }
        if !output.is_complete() {
            return Err(VerificationError::StageNotComplete(self.stage));
        }

        let from = self.stage;
        self.record.merge(output);
        self.pending_events
            .push(WizardEvent::RecordMerged { stage: from });
        self.enter(next, from);
        Ok(next)
    }

    /// Move one stage back. A no-op on the first stage; refused on results.
    pub fn go_back(&mut self) -> Result<Stage, VerificationError> {
        match self.stage {
            Stage::DocumentUpload => Ok(Stage::DocumentUpload),
            Stage::Results => Err(VerificationError::InvalidTransition {
                stage: Stage::Results,
                action: "go back",
            }),
            current => {
                let previous = current.previous().ok_or(VerificationError::InvalidTransition {
                    stage: current,
                    action: "go back",
                })?;
                self.enter(previous, current);
                Ok(previous)
            }
        }
    }

    /// Clear the record and return to the first stage.
    pub fn reset(&mut self) -> Stage {
        let from = self.stage;
        self.record.clear();
        self.stage = Stage::DocumentUpload;
        self.history.clear();
        self.history.push(Stage::DocumentUpload);
        self.pending_events.push(WizardEvent::WizardReset { from });
        tracing::info!(from = %from, "wizard reset");
        Stage::DocumentUpload
    }

    /// Drain pending events.
    pub fn drain_events(&mut self) -> Vec<WizardEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn enter(&mut self, stage: Stage, from: Stage) {
        self.stage = stage;
        self.history.push(stage);
        self.pending_events.push(WizardEvent::StageEntered {
            stage,
            from: Some(from),
        });
        tracing::info!(from = %from, to = %stage, "stage entered");
    }
}
