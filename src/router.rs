//! Maps fired gestures to host actions.
//!
//! The router does no work itself: it turns a [`GestureEvent`] into an
//! [`ActionRequest`] and hands it to whichever [`ActionExecutor`] the host
//! registered for that kind of request.

use crate::types::{GestureEvent, GestureKind};
use std::collections::HashMap;
use std::fmt;

/// System actions a gesture can be bound to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetAction {
    PlayPause,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    MuteMicrophone,
}

impl PresetAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PlayPause => "Play/Pause",
            Self::NextTrack => "Next Track",
            Self::PreviousTrack => "Previous Track",
            Self::VolumeUp => "Volume Up",
            Self::VolumeDown => "Volume Down",
            Self::MuteMicrophone => "Mute Microphone",
        }
    }
}

/// What a gesture is configured to do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GestureAction {
    /// Nod accepts and shake rejects the current prompt.
    #[default]
    PromptResponse,
    RunShortcut(String),
    RecenterMotion,
    ToggleControlMode,
    Preset(PresetAction),
    None,
}

/// Per-gesture action bindings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionMapping {
    pub nod: GestureAction,
    pub shake: GestureAction,
}

impl ActionMapping {
    pub fn action_for(&self, gesture: GestureKind) -> &GestureAction {
        match gesture {
            GestureKind::Nod => &self.nod,
            GestureKind::Shake => &self.shake,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    Accept,
    Reject,
}

impl From<GestureKind> for PromptDecision {
    fn from(gesture: GestureKind) -> Self {
        match gesture {
            GestureKind::Nod => Self::Accept,
            GestureKind::Shake => Self::Reject,
        }
    }
}

/// A concrete request handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Prompt(PromptDecision),
    Shortcut(String),
    Preset(PresetAction),
    Recenter,
    ToggleControlMode,
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Prompt(_) => ActionKind::Prompt,
            Self::Shortcut(_) => ActionKind::Shortcut,
            Self::Preset(_) => ActionKind::Preset,
            Self::Recenter => ActionKind::Recenter,
            Self::ToggleControlMode => ActionKind::ToggleControlMode,
        }
    }
}

/// Executor slot a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Prompt,
    Shortcut,
    Preset,
    Recenter,
    ToggleControlMode,
}

/// Result of routing a gesture.
///
/// `Ignored` means there was nothing to act on; only `Failure` is worth
/// showing to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success(String),
    Failure(String),
    Ignored(String),
}

impl ActionOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Failure(m) | Self::Ignored(m) => m,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn should_surface(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(m) => write!(f, "success: {}", m),
            Self::Failure(m) => write!(f, "failure: {}", m),
            Self::Ignored(m) => write!(f, "ignored: {}", m),
        }
    }
}

/// Host-side implementation of one kind of action.
///
/// Retries, permissions and UI feedback are the executor's concern.
pub trait ActionExecutor {
    fn execute(&mut self, request: &ActionRequest) -> ActionOutcome;
}

impl<F> ActionExecutor for F
where
    F: FnMut(&ActionRequest) -> ActionOutcome,
{
    fn execute(&mut self, request: &ActionRequest) -> ActionOutcome {
        self(request)
    }
}

#[derive(Default)]
pub struct ActionRouter {
    mapping: ActionMapping,
    executors: HashMap<ActionKind, Box<dyn ActionExecutor + Send>>,
}

impl ActionRouter {
    pub fn new(mapping: ActionMapping) -> Self {
        Self {
            mapping,
            executors: HashMap::new(),
        }
    }

    pub fn mapping(&self) -> &ActionMapping {
        &self.mapping
    }

    pub fn set_mapping(&mut self, mapping: ActionMapping) {
        self.mapping = mapping;
    }

    /// Install the executor for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: ActionKind, executor: Box<dyn ActionExecutor + Send>) {
        if self.executors.insert(kind, executor).is_some() {
            log::debug!("Replaced executor for {:?}", kind);
        }
    }

    pub fn unregister(&mut self, kind: ActionKind) {
        self.executors.remove(&kind);
    }

    /// The request a gesture maps to, or an outcome if there is none.
    pub fn request_for(&self, gesture: GestureKind) -> Result<ActionRequest, ActionOutcome> {
        match self.mapping.action_for(gesture) {
            GestureAction::PromptResponse => Ok(ActionRequest::Prompt(gesture.into())),
            GestureAction::RunShortcut(name) => {
                let name = name.trim();
                if name.is_empty() {
                    Err(ActionOutcome::Failure(format!(
                        "No shortcut configured for {}",
                        gesture.as_str()
                    )))
                } else {
                    Ok(ActionRequest::Shortcut(name.to_string()))
                }
            }
            GestureAction::RecenterMotion => Ok(ActionRequest::Recenter),
            GestureAction::ToggleControlMode => Ok(ActionRequest::ToggleControlMode),
            GestureAction::Preset(preset) => Ok(ActionRequest::Preset(*preset)),
            GestureAction::None => Err(ActionOutcome::Ignored(format!(
                "No action mapped to {}",
                gesture.as_str()
            ))),
        }
    }

    /// Dispatch a fired gesture to its executor.
    pub fn route(&mut self, event: &GestureEvent) -> ActionOutcome {
        let request = match self.request_for(event.gesture) {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };

        let outcome = match self.executors.get_mut(&request.kind()) {
            Some(executor) => executor.execute(&request),
            None => ActionOutcome::Ignored(format!("No handler for {:?}", request.kind())),
        };

        match &outcome {
            ActionOutcome::Failure(m) => log::warn!("{} -> {:?} failed: {}", event.gesture.as_str(), request, m),
            _ => log::info!("{} -> {:?}: {}", event.gesture.as_str(), request, outcome),
        }
        outcome
    }
}
