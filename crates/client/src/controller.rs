//! Job controller: sequences upload and progress streaming behind an
//! explicit state machine.
//!
//! [`JobController`] validates a bundle synchronously, uploads it, opens
//! the progress channel with the returned handle, and pumps events until
//! a terminal outcome. It owns at most one channel at a time and
//! enforces single-flight execution: a submission is refused while a
//! prior job is in flight. Callers observe the lifecycle through a
//! broadcast stream of [`JobEvent`]s.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use weft_core::bundle::AssetBundle;
use weft_core::error::ValidationError;
use weft_core::job::{FailureKind, JobState, Outcome, ProgressEvent};

use crate::channel::ProgressChannel;
use crate::endpoints::ServiceEndpoints;
use crate::upload::{UploadApi, UploadError};

/// Broadcast capacity for job events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle notifications observable by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The job moved to a new state.
    StateChanged(JobState),
    /// A non-terminal progress update; never changes state.
    Progress(ProgressEvent),
    /// The terminal outcome of the job.
    Finished(Outcome),
}

/// Errors resolved synchronously by [`JobController::submit`], before any
/// network activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The bundle failed a submission precondition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A job is already in flight on this controller.
    #[error("A job is already in flight; wait for it to finish or dispose the controller first")]
    Busy,
}

/// Bookkeeping for the job currently in flight.
struct ActiveJob {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

struct Inner {
    state: JobState,
    /// Bumped on every submission and disposal; a driver whose
    /// generation no longer matches may not touch controller state.
    generation: u64,
    active: Option<ActiveJob>,
    /// Drivers cancelled by `dispose`, awaited by the next submission so
    /// the old channel is fully torn down before a new one opens.
    draining: Vec<tokio::task::JoinHandle<()>>,
    last_progress: Option<ProgressEvent>,
    last_outcome: Option<Outcome>,
}

/// Orchestrates one job at a time against a weaving service.
pub struct JobController {
    api: UploadApi,
    endpoints: ServiceEndpoints,
    event_tx: broadcast::Sender<JobEvent>,
    inner: Mutex<Inner>,
}

impl JobController {
    /// Create a controller for a weaving service.
    ///
    /// The returned `Arc` can be cheaply cloned into UI callbacks.
    pub fn new(endpoints: ServiceEndpoints) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api: UploadApi::new(endpoints.clone()),
            endpoints,
            event_tx,
            inner: Mutex::new(Inner {
                state: JobState::Idle,
                generation: 0,
                active: None,
                draining: Vec::new(),
                last_progress: None,
                last_outcome: None,
            }),
        })
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        self.inner.lock().state
    }

    /// Most recent progress notification for the current job, if any.
    pub fn last_progress(&self) -> Option<ProgressEvent> {
        self.inner.lock().last_progress.clone()
    }

    /// Outcome of the most recently finished job, if any.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.inner.lock().last_outcome.clone()
    }

    /// Endpoints this controller talks to.
    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Absolute artifact URL of the last successful job, if any.
    pub fn result_url(&self) -> Option<String> {
        match self.inner.lock().last_outcome {
            Some(Outcome::Success {
                ref result_location,
            }) => Some(self.endpoints.resolve_result(result_location)),
            _ => None,
        }
    }

    /// Submit a bundle for processing.
    ///
    /// Preconditions run synchronously, in order: primary media present,
    /// palette non-empty, primary selection resolving to a palette
    /// member. The first violation short-circuits with zero network
    /// activity. While a job is in flight the submission is refused with
    /// [`SubmitError::Busy`]; wait for a terminal state or call
    /// [`dispose`](Self::dispose) first.
    ///
    /// Must be called from within a Tokio runtime: the accepted job is
    /// driven by a spawned task.
    pub fn submit(self: &Arc<Self>, bundle: AssetBundle) -> Result<(), SubmitError> {
        let mut inner = self.inner.lock();

        if !inner.state.accepts_submission() {
            tracing::warn!(state = ?inner.state, "Submission refused: job in flight");
            return Err(SubmitError::Busy);
        }

        let primary_sound_name = match bundle.validate_for_submission() {
            Ok(entry) => entry.blob.filename.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Submission refused: invalid bundle");
                return Err(e.into());
            }
        };

        inner.generation += 1;
        let generation = inner.generation;
        inner.last_progress = None;
        inner.last_outcome = None;
        self.set_state(&mut inner, JobState::Validating);
        self.set_state(&mut inner, JobState::Uploading);
        let synthetic = ProgressEvent {
            status: "Preparing to upload".to_string(),
            percent: 0,
        };
        inner.last_progress = Some(synthetic.clone());
        self.send_event(JobEvent::Progress(synthetic));

        let mut prior_tasks = std::mem::take(&mut inner.draining);
        if let Some(active) = inner.active.take() {
            active.cancel.cancel();
            prior_tasks.push(active.task);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(self).drive(
            bundle,
            primary_sound_name,
            generation,
            cancel.clone(),
            prior_tasks,
        ));
        inner.active = Some(ActiveJob { cancel, task });

        tracing::info!(generation, "Job submission accepted");
        Ok(())
    }

    /// Tear down any in-flight job. Idempotent; safe at any state.
    ///
    /// An open channel is closed. An upload still in flight is not
    /// aborted, but its result is discarded: no state transition can
    /// occur from a disposed generation. The controller re-arms to
    /// `Idle`.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        if let Some(active) = inner.active.take() {
            tracing::info!("Disposing in-flight job");
            active.cancel.cancel();
            inner.draining.push(active.task);
        }
        inner.generation += 1;
        inner.last_progress = None;
        self.set_state(&mut inner, JobState::Idle);
    }

    // ---- private helpers ----

    /// Upload, open the channel, pump events until terminal.
    async fn drive(
        self: Arc<Self>,
        bundle: AssetBundle,
        primary_sound_name: String,
        generation: u64,
        cancel: CancellationToken,
        prior_tasks: Vec<tokio::task::JoinHandle<()>>,
    ) {
        // The previous channel must be fully torn down before this job
        // may open a new one.
        for task in prior_tasks {
            let _ = task.await;
        }

        let handle = match self.api.upload(&bundle).await {
            Ok(handle) => handle,
            Err(e) => {
                let kind = match &e {
                    UploadError::Transport(_) => FailureKind::Connection,
                    UploadError::Rejected { .. } | UploadError::InvalidBundle(_) => {
                        FailureKind::Remote
                    }
                };
                self.finish(
                    generation,
                    Outcome::Failure {
                        kind,
                        message: e.to_string(),
                    },
                );
                return;
            }
        };

        if !self.transition_if_current(generation, JobState::AwaitingChannel) {
            tracing::debug!(job_id = %handle.job_id, "Disposed during upload; discarding result");
            return;
        }
        self.emit_progress(
            generation,
            ProgressEvent {
                status: "Connecting to weaver".to_string(),
                percent: 0,
            },
        );

        let channel = match ProgressChannel::open(
            &self.endpoints,
            &handle,
            &bundle.config,
            &primary_sound_name,
            cancel.child_token(),
        )
        .await
        {
            Ok(channel) => channel,
            Err(e) => {
                tracing::error!(job_id = %handle.job_id, error = %e, "Failed to open progress channel");
                self.finish(
                    generation,
                    Outcome::Failure {
                        kind: FailureKind::Connection,
                        message: e.to_string(),
                    },
                );
                return;
            }
        };

        let _ = self.transition_if_current(generation, JobState::Streaming);

        // Pump progress while the channel runs; the pump drains once the
        // channel drops its sender.
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let pump = async {
            while let Some(event) = progress_rx.recv().await {
                self.emit_progress(generation, event);
            }
        };
        let (outcome, ()) = tokio::join!(channel.run(progress_tx), pump);

        match outcome {
            Some(outcome) => self.finish(generation, outcome),
            None => {
                // Cancelled before any terminal message: no outcome.
                tracing::debug!(job_id = %handle.job_id, "Channel cancelled before terminal message");
            }
        }
    }

    /// Record the terminal outcome, unless the job was superseded.
    fn finish(&self, generation: u64, outcome: Outcome) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!("Discarding outcome for a superseded job");
            return;
        }

        match &outcome {
            Outcome::Success { result_location } => {
                tracing::info!(result_location = %result_location, "Job succeeded");
                self.set_state(&mut inner, JobState::Succeeded);
            }
            Outcome::Failure {
                kind: FailureKind::Remote,
                message,
            } => {
                tracing::warn!(error = %message, "Job failed");
                self.set_state(&mut inner, JobState::Failed);
            }
            Outcome::Failure {
                kind: FailureKind::Connection,
                message,
            } => {
                tracing::error!(error = %message, "Job failed: connection lost");
                self.set_state(&mut inner, JobState::Failed);
            }
        }

        inner.last_outcome = Some(outcome.clone());
        // The channel closes itself on a terminal message; cancelling the
        // slot too keeps the close guarantee independent of that path.
        if let Some(active) = inner.active.take() {
            active.cancel.cancel();
        }
        self.send_event(JobEvent::Finished(outcome));
    }

    /// Move to `state` if `generation` is still current.
    fn transition_if_current(&self, generation: u64, state: JobState) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        self.set_state(&mut inner, state);
        true
    }

    /// Forward a progress event, unless the job was superseded.
    fn emit_progress(&self, generation: u64, event: ProgressEvent) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.last_progress = Some(event.clone());
        }
        self.send_event(JobEvent::Progress(event));
    }

    fn set_state(&self, inner: &mut Inner, state: JobState) {
        if inner.state == state {
            return;
        }
        tracing::debug!(from = ?inner.state, to = ?state, "Job state changed");
        inner.state = state;
        self.send_event(JobEvent::StateChanged(state));
    }

    fn send_event(&self, event: JobEvent) {
        // Nobody subscribed is fine; events are advisory.
        let _ = self.event_tx.send(event);
    }
}
