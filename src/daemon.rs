//! Daemon - the assistant service
//!
//! Owns the two units of execution: the perception loop on a blocking worker,
//! and the command loop on the caller's task (audio streams are not `Send`).
//! Everything they share lives in an explicit [`Pipeline`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::command::{Action, Interpreter, Task};
use crate::detect::{Aggregator, Detector, HttpDetector, SingleShot};
use crate::knowledge::{DescriptionLookup, DuckDuckGo};
use crate::perception::{self, PerceptionHandle, PerceptionStatus};
use crate::response::{self, Responder};
use crate::vision::{CameraSource, FrameChannel, FrameSource};
use crate::voice::{Listener, Speaker};
use crate::{Config, Error, Result};

/// Shared context for one assistant session
pub struct Pipeline {
    config: Arc<Config>,
    channel: Arc<FrameChannel>,
    aggregator: Aggregator,
    lookup: Option<Arc<dyn DescriptionLookup>>,
    perception: PerceptionHandle,
    status_tx: Option<watch::Sender<PerceptionStatus>>,
}

impl Pipeline {
    /// Assemble a pipeline around a detector and optional description lookup
    #[must_use]
    pub fn new(
        config: Config,
        detector: Arc<dyn Detector>,
        lookup: Option<Arc<dyn DescriptionLookup>>,
    ) -> Self {
        let channel = Arc::new(FrameChannel::new(config.camera.channel_capacity));
        let aggregator = Aggregator::new(detector, &config.detection);
        let (perception, status_tx) = PerceptionHandle::new();

        Self {
            config: Arc::new(config),
            channel,
            aggregator,
            lookup,
            perception,
            status_tx: Some(status_tx),
        }
    }

    /// Build the production pipeline: HTTP detector plus `DuckDuckGo` lookups
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP clients cannot be built
    pub fn from_config(config: Config) -> Result<Self> {
        let detector = HttpDetector::new(
            config.detection.endpoint.clone(),
            config.detection.request_timeout,
        )?;
        let lookup = DuckDuckGo::from_config(&config.knowledge)?
            .map(|ddg| Arc::new(ddg) as Arc<dyn DescriptionLookup>);

        Ok(Self::new(config, Arc::new(detector), lookup))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn channel(&self) -> &Arc<FrameChannel> {
        &self.channel
    }

    #[must_use]
    pub const fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    #[must_use]
    pub const fn perception(&self) -> &PerceptionHandle {
        &self.perception
    }

    /// Start the perception loop on a blocking worker
    ///
    /// # Errors
    ///
    /// Returns error if perception was already started for this pipeline
    pub fn spawn_perception<S>(&mut self, source: S) -> Result<JoinHandle<PerceptionStatus>>
    where
        S: FrameSource + 'static,
    {
        let status = self
            .status_tx
            .take()
            .ok_or_else(|| Error::Config("perception already started".to_string()))?;
        let channel = Arc::clone(&self.channel);
        let stop = self.perception.stop_flag();
        let config = Arc::clone(&self.config);

        Ok(tokio::task::spawn_blocking(move || {
            perception::run(source, &channel, &stop, &status, &config.camera)
        }))
    }
}

/// Listens, interprets, and answers until the session ends
pub struct CommandLoop<'a, L, S> {
    pipeline: &'a Pipeline,
    listener: L,
    responder: Responder<S>,
    interpreter: Interpreter,
    degraded_notified: bool,
}

impl<'a, L: Listener, S: Speaker> CommandLoop<'a, L, S> {
    pub fn new(pipeline: &'a Pipeline, listener: L, speaker: S) -> Self {
        Self {
            interpreter: Interpreter::from_config(&pipeline.config.voice),
            pipeline,
            listener,
            responder: Responder::new(speaker),
            degraded_notified: false,
        }
    }

    #[must_use]
    pub const fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Give back the speaker, e.g. to inspect what was said
    pub fn into_speaker(self) -> S {
        self.responder.into_inner()
    }

    /// Run until the exit phrase or until input is gone
    ///
    /// # Errors
    ///
    /// Returns error only if the standby greeting cannot be spoken
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self) -> Result<()> {
        let greeting = response::standby_greeting(self.interpreter.wake_phrases().primary());
        self.responder.say(&greeting).await?;
        tracing::info!("waiting for wake phrase");

        while !self.interpreter.is_terminated() {
            let action = match self.listener.listen().await {
                Ok(text) => self.interpreter.on_utterance(&text),
                Err(e) if e.is_end_of_input() => {
                    tracing::info!(error = %e, "input closed, ending session");
                    break;
                }
                Err(e) => {
                    if e.is_recognition_failure() {
                        tracing::debug!(error = %e, "recognition failed");
                    } else {
                        tracing::warn!(error = %e, "listen failed");
                    }
                    self.interpreter.on_recognition_failure()
                }
            };

            self.perform(action).await;
        }

        Ok(())
    }

    #[allow(clippy::future_not_send)]
    async fn perform(&mut self, action: Action) {
        let text = match action {
            Action::Ignore => return,
            Action::Acknowledge => response::ACKNOWLEDGE.to_string(),
            Action::Clarify => response::CLARIFY.to_string(),
            Action::RequestRepeat => response::REQUEST_REPEAT.to_string(),
            Action::Farewell => response::FAREWELL.to_string(),
            Action::Dispatch(task) => {
                tracing::info!(?task, "dispatching");
                self.run_task(task).await
            }
        };

        self.respond(&text).await;
    }

    async fn run_task(&self, task: Task) -> String {
        let aggregator = &self.pipeline.aggregator;
        let channel = &self.pipeline.channel;

        match task {
            Task::DescribeHand => {
                let outcome = aggregator.single_shot(channel).await;
                let description = match (&outcome, &self.pipeline.lookup) {
                    (SingleShot::Found(sighting), Some(lookup)) => {
                        match lookup.lookup(&sighting.label).await {
                            Ok(description) => description,
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    label = %sighting.label,
                                    "description lookup failed"
                                );
                                Some(response::KNOWLEDGE_FALLBACK.to_string())
                            }
                        }
                    }
                    _ => None,
                };
                response::describe_hand(&outcome, description.as_deref())
            }
            Task::DescribeSurroundings => {
                let outcome = aggregator.survey(channel).await;
                response::describe_survey(&outcome)
            }
            Task::ShowLiveView => self.live_view().await,
        }
    }

    /// Headless live view: log every allowed detection in one fresh frame
    async fn live_view(&self) -> String {
        let aggregator = &self.pipeline.aggregator;
        let timeout = self.pipeline.config.detection.frame_timeout;

        let frame = match self.pipeline.channel.take_timeout(timeout).await {
            Ok(frame) => frame,
            Err(Error::DeviceUnavailable(_)) => return response::NO_VISUAL_DATA.to_string(),
            Err(_) => return response::NOTHING_SEEN.to_string(),
        };

        for detection in aggregator.detect(&frame).await {
            if aggregator.allow_list().contains(&detection.label) {
                tracing::info!(
                    sequence = frame.sequence(),
                    label = %detection.label,
                    confidence = detection.confidence,
                    bbox = ?detection.bbox,
                    "live view"
                );
            }
        }

        response::LIVE_VIEW.to_string()
    }

    /// Speak a response, announcing degraded mode first if it is new
    #[allow(clippy::future_not_send)]
    async fn respond(&mut self, text: &str) {
        if !self.degraded_notified && self.pipeline.perception.status().is_failed() {
            self.degraded_notified = true;
            if let Err(e) = self.responder.say(response::DEGRADED).await {
                tracing::warn!(error = %e, "failed to speak degraded notice");
            }
        }

        if let Err(e) = self.responder.say(text).await {
            tracing::warn!(error = %e, "failed to speak response");
        }
    }
}

/// Run one full session: perception in the background, commands in front
///
/// Ends on the exit phrase, when input closes, or when `shutdown` resolves.
/// Perception is stopped and joined before returning.
///
/// # Errors
///
/// Returns error if perception cannot start or the greeting cannot be spoken
#[allow(clippy::future_not_send)]
pub async fn run_session<C, L, S>(
    mut pipeline: Pipeline,
    source: C,
    listener: L,
    speaker: S,
    shutdown: impl Future<Output = ()>,
) -> Result<S>
where
    C: FrameSource + 'static,
    L: Listener,
    S: Speaker,
{
    let worker = pipeline.spawn_perception(source)?;

    let mut commands = CommandLoop::new(&pipeline, listener, speaker);
    let result = tokio::select! {
        result = commands.run() => result,
        () = shutdown => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    };
    let speaker = commands.into_speaker();

    pipeline.perception().stop();
    match worker.await {
        Ok(status) => tracing::debug!(?status, "perception joined"),
        Err(e) => tracing::error!(error = %e, "perception worker panicked"),
    }
    tracing::info!(stats = ?pipeline.channel().stats(), "session ended");

    result.map(|()| speaker)
}

/// The Sightline daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Open the camera, build the pipeline, and run until exit or Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if the camera backend or HTTP clients cannot be created
    #[allow(clippy::future_not_send)]
    pub async fn run<L: Listener, S: Speaker>(self, listener: L, speaker: S) -> Result<()> {
        let source = CameraSource::open(&self.config.camera)?;
        tracing::info!(
            camera = source.name(),
            detector = %self.config.detection.endpoint,
            "starting sightline"
        );

        let pipeline = Pipeline::from_config(self.config)?;
        let ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler: never resolve
                std::future::pending::<()>().await;
            }
        };

        run_session(pipeline, source, listener, speaker, ctrl_c).await?;
        Ok(())
    }
}
