//! Liveness challenge engine.
//!
//! Draws the three challenge types in random order without repetition,
//! presents each one with an auto-attempt timer, evaluates attempts against
//! the verification services and reports the full result once every type
//! has passed.
//!
//! The engine is driven by its owner: [`ChallengeEngine::step`] waits for the
//! armed timer and runs the automatic attempt, [`ChallengeEngine::attempt`]
//! and [`ChallengeEngine::retry`] are the manual triggers. A passed challenge
//! holds `Correct!` for a short pause before the next one is drawn; `step`
//! sits out the pause, [`ChallengeEngine::next_challenge`] ends it early.
//! Every action takes `&mut self`, so two attempts can never overlap.

use ekyc_capture::{Camera, CaptureSession, LiveFeed};
use ekyc_services::VerificationServices;
use ekyc_types::{Challenge, ChallengeType, LivenessResults, StageOutput};
use ekyc_utils::StatsCounter;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::VerificationError;
use crate::state::{AttemptOutcome, AttemptTrigger, ChallengeState, Feedback};

/// Feedback shown when the evaluation call itself fails.
pub const SERVICE_FAILURE_MESSAGE: &str =
    "An error occurred during liveness detection. Please try again.";

/// Pause between a passed challenge and the next draw.
pub const DEFAULT_NEXT_CHALLENGE_DELAY: Duration = Duration::from_millis(1_500);

const STAT_NAMES: &[&str] = &[
    "timers_armed",
    "timers_cancelled",
    "timers_fired",
    "attempts",
    "service_failures",
];

/// Events recorded by the engine for the caller to process.
#[derive(Clone, Debug, PartialEq)]
pub enum ChallengeEvent {
    /// A challenge became current and its instruction is on screen.
    ChallengePresented { challenge: Challenge },
    AttemptStarted {
        kind: ChallengeType,
        trigger: AttemptTrigger,
    },
    ChallengePassed { kind: ChallengeType },
    ChallengeNotMet { kind: ChallengeType },
    ServiceFailed { kind: ChallengeType, message: String },
    /// Every type passed. Recorded exactly once per engine.
    AllChallengesCompleted { results: LivenessResults },
}

/// The single outstanding timer: auto-attempt while presenting, the
/// post-pass pause while passed.
#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Liveness sub-protocol state machine.
pub struct ChallengeEngine<S: VerificationServices, C: Camera, R: Rng> {
    services: Arc<S>,
    rng: R,
    auto_attempt_delay: Duration,
    next_challenge_delay: Duration,
    session: Option<CaptureSession<C>>,
    state: ChallengeState,
    current: Option<Challenge>,
    /// Passed types in completion order. Never holds duplicates.
    completed: Vec<ChallengeType>,
    feedback: Feedback,
    timer: Option<PendingTimer>,
    next_generation: u64,
    timer_tx: mpsc::UnboundedSender<u64>,
    timer_rx: mpsc::UnboundedReceiver<u64>,
    completion_emitted: bool,
    pending_events: Vec<ChallengeEvent>,
    stats: StatsCounter,
}

impl<S: VerificationServices, C: Camera, R: Rng> ChallengeEngine<S, C, R> {
    pub fn new(services: Arc<S>, rng: R, auto_attempt_delay: Duration) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            services,
            rng,
            auto_attempt_delay,
            next_challenge_delay: DEFAULT_NEXT_CHALLENGE_DELAY,
            session: None,
            state: ChallengeState::Idle,
            current: None,
            completed: Vec::new(),
            feedback: Feedback::Preparing,
            timer: None,
            next_generation: 0,
            timer_tx,
            timer_rx,
            completion_emitted: false,
            pending_events: Vec::new(),
            stats: StatsCounter::new(STAT_NAMES),
        }
    }

    pub fn with_next_challenge_delay(mut self, delay: Duration) -> Self {
        self.next_challenge_delay = delay;
        self
    }

    /// Take ownership of a live session and present the first challenge.
    ///
    /// Must be called from within a tokio runtime; the auto-attempt timer is
    /// a spawned task.
    pub fn start(&mut self, session: CaptureSession<C>) -> Result<(), VerificationError> {
        if self.state != ChallengeState::Idle {
            return Err(VerificationError::InvalidChallengeState {
                state: self.state,
                action: "start",
            });
        }
        tracing::info!(session = session.id(), "liveness challenges starting");
        self.session = Some(session);
        self.select_next();
        Ok(())
    }

    /// Record that no capture session could be opened. The engine stays idle
    /// until [`ChallengeEngine::start`] succeeds.
    pub fn camera_unavailable(&mut self) {
        self.feedback = Feedback::CameraUnavailable;
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn current(&self) -> Option<&Challenge> {
        self.current.as_ref()
    }

    /// Types passed so far, in completion order.
    pub fn completed(&self) -> &[ChallengeType] {
        &self.completed
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn has_live_session(&self) -> bool {
        self.session.as_ref().is_some_and(CaptureSession::is_open)
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// Drain the recorded events.
    pub fn drain_events(&mut self) -> Vec<ChallengeEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// The stage output, once every challenge has passed.
    pub fn completion(&self) -> Option<StageOutput> {
        if self.state != ChallengeState::AllDone {
            return None;
        }
        Some(StageOutput::Liveness {
            results: self.results(),
            all_completed: true,
        })
    }

    /// Wait for the armed timer and run the automatic attempt.
    ///
    /// From [`ChallengeState::Passed`] the pause runs out first and the next
    /// challenge is presented. Returns `Ok(None)` when no timer is left to
    /// wait for, which after a pass means every challenge is done.
    pub async fn step(&mut self) -> Result<Option<AttemptOutcome>, VerificationError> {
        loop {
            if !self.wait_for_timer().await {
                return Ok(None);
            }
            if self.state == ChallengeState::Passed {
                self.select_next();
                continue;
            }
            return self.attempt(AttemptTrigger::Auto).await.map(Some);
        }
    }

    /// End the pause after a pass and draw the next challenge now.
    pub fn next_challenge(&mut self) -> Result<ChallengeState, VerificationError> {
        if self.state != ChallengeState::Passed {
            return Err(VerificationError::InvalidChallengeState {
                state: self.state,
                action: "next challenge",
            });
        }
        self.cancel_timer();
        self.select_next();
        Ok(self.state)
    }

    /// Attempt the current challenge now.
    ///
    /// Allowed while presenting (user acts before the timer) or retrying.
    /// Cancels the pending timer before the evaluation call starts.
    pub async fn attempt(
        &mut self,
        trigger: AttemptTrigger,
    ) -> Result<AttemptOutcome, VerificationError> {
        if !self.state.accepts_attempt() {
            return Err(VerificationError::InvalidChallengeState {
                state: self.state,
                action: "attempt",
            });
        }
        let challenge = self
            .current
            .clone()
            .ok_or(VerificationError::InvalidChallengeState {
                state: self.state,
                action: "attempt",
            })?;

        self.cancel_timer();
        self.state = ChallengeState::Attempting;
        self.feedback = Feedback::Attempting {
            instruction: challenge.instruction.clone(),
        };
        self.stats.increment("attempts");
        self.pending_events.push(ChallengeEvent::AttemptStarted {
            kind: challenge.kind,
            trigger,
        });
        tracing::info!(challenge = %challenge.kind, trigger = ?trigger, "attempting challenge");

        let services = Arc::clone(&self.services);
        let result = match self.session.as_ref() {
            Some(session) => {
                services
                    .evaluate_challenge(&challenge, session as &dyn LiveFeed)
                    .await
            }
            None => {
                self.state = ChallengeState::Retrying;
                self.feedback = Feedback::CameraUnavailable;
                return Err(VerificationError::CameraUnavailable(
                    "no live capture session".to_string(),
                ));
            }
        };

        match result {
            Ok(true) => {
                self.state = ChallengeState::Passed;
                if !self.completed.contains(&challenge.kind) {
                    self.completed.push(challenge.kind);
                }
                self.feedback = Feedback::Correct;
                self.pending_events.push(ChallengeEvent::ChallengePassed {
                    kind: challenge.kind,
                });
                tracing::info!(
                    challenge = %challenge.kind,
                    completed = self.completed.len(),
                    "challenge passed"
                );
                self.current = None;
                self.arm_timer(self.next_challenge_delay);
                Ok(AttemptOutcome::Passed(challenge.kind))
            }
            Ok(false) => {
                self.state = ChallengeState::Retrying;
                self.feedback = Feedback::NotMet;
                self.pending_events.push(ChallengeEvent::ChallengeNotMet {
                    kind: challenge.kind,
                });
                tracing::info!(challenge = %challenge.kind, "challenge not met");
                Ok(AttemptOutcome::NotMet(challenge.kind))
            }
            Err(e) => {
                self.state = ChallengeState::Retrying;
                self.feedback = Feedback::ServiceFailed {
                    message: SERVICE_FAILURE_MESSAGE.to_string(),
                };
                self.stats.increment("service_failures");
                self.pending_events.push(ChallengeEvent::ServiceFailed {
                    kind: challenge.kind,
                    message: e.to_string(),
                });
                tracing::warn!(challenge = %challenge.kind, error = %e, "challenge evaluation failed");
                Err(VerificationError::ServiceCallFailed(e))
            }
        }
    }

    /// Re-attempt the current challenge after a failure.
    pub async fn retry(&mut self) -> Result<AttemptOutcome, VerificationError> {
        if self.state != ChallengeState::Retrying {
            return Err(VerificationError::InvalidChallengeState {
                state: self.state,
                action: "retry",
            });
        }
        self.attempt(AttemptTrigger::Manual).await
    }

    /// Cancel the pending timer and release the camera. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.cancel_timer();
        if let Some(mut session) = self.session.take() {
            session.close();
            tracing::debug!(state = ?self.state, "challenge engine torn down");
        }
    }

    fn results(&self) -> LivenessResults {
        self.completed.iter().map(|&kind| (kind, true)).collect()
    }

    /// Firings left over from a cancelled timer are skipped. `false` when
    /// nothing is armed.
    async fn wait_for_timer(&mut self) -> bool {
        loop {
            let Some(armed) = self.timer.as_ref().map(|t| t.generation) else {
                return false;
            };
            let Some(fired) = self.timer_rx.recv().await else {
                return false;
            };
            if fired != armed {
                tracing::trace!(fired, armed, "stale timer firing ignored");
                continue;
            }
            self.timer = None;
            self.stats.increment("timers_fired");
            return true;
        }
    }

    fn select_next(&mut self) {
        self.state = ChallengeState::Selecting;
        if self.completed.len() >= ChallengeType::ALL.len() {
            self.finish();
            return;
        }
        let kind = loop {
            let drawn = ChallengeType::ALL[self.rng.gen_range(0..ChallengeType::ALL.len())];
            if !self.completed.contains(&drawn) {
                break drawn;
            }
            tracing::trace!(challenge = %drawn, "completed type drawn again, re-drawing");
        };
        let challenge = Challenge::random(kind, &mut self.rng);
        self.present(challenge);
    }

    fn present(&mut self, challenge: Challenge) {
        self.state = ChallengeState::Presenting;
        self.feedback = Feedback::Instruction {
            index: self.completed.len() + 1,
            total: ChallengeType::ALL.len(),
            instruction: challenge.instruction.clone(),
        };
        tracing::info!(
            challenge = %challenge.kind,
            instruction = %challenge.instruction,
            "challenge presented"
        );
        self.pending_events.push(ChallengeEvent::ChallengePresented {
            challenge: challenge.clone(),
        });
        self.current = Some(challenge);
        self.arm_timer(self.auto_attempt_delay);
    }

    fn finish(&mut self) {
        self.cancel_timer();
        self.current = None;
        self.state = ChallengeState::AllDone;
        self.feedback = Feedback::AllCompleted;
        if !self.completion_emitted {
            self.completion_emitted = true;
            let results = self.results();
            self.pending_events
                .push(ChallengeEvent::AllChallengesCompleted { results });
            tracing::info!("all liveness challenges completed");
        }
    }

    fn arm_timer(&mut self, delay: Duration) {
        self.cancel_timer();
        while self.timer_rx.try_recv().is_ok() {}

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.timer_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(generation);
        });
        self.timer = Some(PendingTimer { generation, handle });
        self.stats.increment("timers_armed");
        tracing::debug!(
            generation,
            state = ?self.state,
            delay_ms = delay.as_millis() as u64,
            "timer armed"
        );
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
            self.stats.increment("timers_cancelled");
            tracing::debug!(generation = timer.generation, "timer cancelled");
        }
    }
}

impl<S: VerificationServices, C: Camera, R: Rng> Drop for ChallengeEngine<S, C, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<S: VerificationServices, C: Camera, R: Rng> std::fmt::Debug for ChallengeEngine<S, C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeEngine")
            .field("state", &self.state)
            .field("current", &self.current.as_ref().map(|c| c.kind))
            .field("completed", &self.completed)
            .field("timer_pending", &self.timer.is_some())
            .finish()
    }
}
