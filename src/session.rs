//! The four-step wizard session.
//!
//! A session is in exactly one [`Step`]. Each run started with
//! [`Session::begin`] gets a [`Generation`] token; updates carrying an older
//! token are ignored, so a run that finishes after a reset cannot touch the
//! new state.

use crate::error::{Result, StoryError};
use crate::media::MediaRef;
use crate::plan::ContentPlan;
use serde::Serialize;

/// Wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Waiting for the form.
    #[default]
    Input,
    /// A run is in flight.
    Planning,
    /// Plan and media are ready.
    Result,
    /// The last run failed.
    Error,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Planning => "planning",
            Self::Result => "result",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Identifies one run of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

/// UI session state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    step: Step,
    plan: Option<ContentPlan>,
    media: Option<MediaRef>,
    loading_message: String,
    error: Option<String>,
    generation: u64,
}

impl Session {
    /// A fresh session on the input step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    pub fn step(&self) -> Step {
        self.step
    }

    /// The plan, present only on [`Step::Result`].
    pub fn plan(&self) -> Option<&ContentPlan> {
        self.plan.as_ref()
    }

    /// The media, present only on [`Step::Result`].
    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    /// Message for the planning screen.
    pub fn loading_message(&self) -> &str {
        &self.loading_message
    }

    /// The user-facing error, present only on [`Step::Error`].
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Token of the most recent run.
    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    /// Returns true if `token` belongs to the run the session is showing.
    pub fn is_current(&self, token: Generation) -> bool {
        token.0 == self.generation
    }

    /// Moves from input to planning and returns the new run's token.
    pub fn begin(&mut self) -> Result<Generation> {
        if self.step != Step::Input {
            return Err(StoryError::InvalidRequest(format!(
                "cannot start a run while on the {} step",
                self.step
            )));
        }
        self.generation += 1;
        self.step = Step::Planning;
        self.loading_message.clear();
        Ok(Generation(self.generation))
    }

    /// Updates the planning screen message. Stale tokens are ignored.
    pub fn set_loading(&mut self, token: Generation, message: impl Into<String>) -> bool {
        if !self.accepts(token) {
            return false;
        }
        self.loading_message = message.into();
        true
    }

    /// Enters the result step.
    ///
    /// Returns `Ok(false)` without changes for a stale token, and an error
    /// when the media URL is empty.
    pub fn complete(&mut self, token: Generation, plan: ContentPlan, media: MediaRef) -> Result<bool> {
        if !self.accepts(token) {
            return Ok(false);
        }
        if media.url.trim().is_empty() {
            return Err(StoryError::UnexpectedResponse("media URL is empty".into()));
        }
        self.step = Step::Result;
        self.plan = Some(plan);
        self.media = Some(media);
        self.loading_message.clear();
        Ok(true)
    }

    /// Enters the error step. Stale tokens are ignored.
    pub fn fail(&mut self, token: Generation, message: impl Into<String>) -> bool {
        if !self.accepts(token) {
            return false;
        }
        self.step = Step::Error;
        self.error = Some(message.into());
        self.loading_message.clear();
        true
    }

    /// Back to input with everything cleared. Any run in flight becomes stale.
    pub fn reset(&mut self) {
        self.step = Step::Input;
        self.plan = None;
        self.media = None;
        self.loading_message.clear();
        self.error = None;
        self.generation += 1;
    }

    fn accepts(&self, token: Generation) -> bool {
        self.is_current(token) && self.step == Step::Planning
    }
}
