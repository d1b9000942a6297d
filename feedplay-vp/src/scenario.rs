//! Scripted feed scenarios
//!
//! A scenario is a TOML list of `[[step]]` tables replayed against a
//! coordinator running on the in-memory host:
//!
//! ```toml
//! name = "rapid scroll"
//!
//! [[step]]
//! action = "register"
//! slot = "a"
//! progressive = "https://cdn.example/a.mp4"
//! adaptive = "https://cdn.example/a/master.m3u8"
//!
//! [[step]]
//! action = "activate"
//! slot = "a"
//! muted = false
//! background = true
//! ```
//!
//! `background = true` fires the activation without waiting for it, which is
//! how fast scrolling looks from the coordinator's side.

use crate::config::CoordinatorConfig;
use crate::coordinator::{ActivateOptions, ActivateOutcome, CoordinatorPhase, PlaybackCoordinator};
use crate::error::{Error, Result};
use crate::host::SurfaceHandle;
use crate::registry::SourceSet;
use crate::sim::SimDocument;
use feedplay_common::events::Visibility;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A scripted sequence of feed interactions
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// One scripted interaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Register {
        slot: String,
        /// Defaults to the slot id
        #[serde(default)]
        surface: Option<String>,
        progressive: String,
        #[serde(default)]
        adaptive: Option<String>,
    },
    Unregister {
        slot: String,
    },
    Activate {
        slot: String,
        #[serde(default = "default_muted")]
        muted: bool,
        #[serde(default)]
        start_at: Option<f64>,
        #[serde(default)]
        background: bool,
    },
    Deactivate,
    PauseAll,
    SetMuted {
        muted: bool,
    },
    Hide,
    Show,
    /// Start an unrelated audible instance
    Stray {
        url: String,
    },
    RejectPlay {
        reject: bool,
    },
    FailManifest {
        url: String,
    },
    FailSource {
        url: String,
    },
    Sleep {
        ms: u64,
    },
    Destroy,
}

fn default_muted() -> bool {
    true
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Scenario(format!("Invalid scenario: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario = Self::from_toml_str(&content)?;
        info!(
            "Loaded scenario {:?} ({} steps) from {:?}",
            scenario.name.as_deref().unwrap_or("unnamed"),
            scenario.steps.len(),
            path
        );
        Ok(scenario)
    }
}

/// Outcome of one activation step
#[derive(Debug, Clone, Serialize)]
pub struct ActivationRecord {
    pub slot: String,
    #[serde(flatten)]
    pub outcome: ActivateOutcome,
}

/// Final report of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: Option<String>,
    pub steps: usize,
    pub activations: Vec<ActivationRecord>,
    pub active_slot: Option<String>,
    pub phase: CoordinatorPhase,
    pub registered_slots: usize,
    pub playing_instances: usize,
    pub audible_instances: usize,
}

/// Replays scenarios on a coordinator over a [`SimDocument`]
pub struct ScenarioRunner {
    document: SimDocument,
    coordinator: PlaybackCoordinator,
    visibility: watch::Sender<Visibility>,
    watcher: JoinHandle<()>,
    background: Vec<(String, JoinHandle<ActivateOutcome>)>,
    activations: Vec<ActivationRecord>,
}

impl ScenarioRunner {
    /// Must be called inside a tokio runtime (spawns the visibility watcher)
    pub fn new(config: CoordinatorConfig) -> Self {
        let document = SimDocument::new();
        let coordinator = document.coordinator(config);
        let (visibility, rx) = watch::channel(Visibility::Visible);
        let watcher = coordinator.spawn_visibility_watcher(rx);
        Self {
            document,
            coordinator,
            visibility,
            watcher,
            background: Vec::new(),
            activations: Vec::new(),
        }
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn document(&self) -> &SimDocument {
        &self.document
    }

    /// Run every step, then wait for background activations to finish
    pub async fn run(&mut self, scenario: &Scenario) -> Result<RunSummary> {
        for (index, step) in scenario.steps.iter().enumerate() {
            debug!("Step {}: {:?}", index + 1, step);
            self.apply(step).await?;
        }
        self.join_background().await?;

        let state = self.coordinator.state();
        Ok(RunSummary {
            scenario: scenario.name.clone(),
            steps: scenario.steps.len(),
            activations: std::mem::take(&mut self.activations),
            active_slot: state.active_slot.map(|id| id.to_string()),
            phase: state.phase,
            registered_slots: self.coordinator.slot_count(),
            playing_instances: self.document.playing_elements().len(),
            audible_instances: self.document.audible_elements().len(),
        })
    }

    async fn apply(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Register {
                slot,
                surface,
                progressive,
                adaptive,
            } => {
                let sources = SourceSet::new(adaptive.clone(), progressive.clone())?;
                let surface = SurfaceHandle::new(surface.as_deref().unwrap_or(slot));
                self.coordinator.register_slot(slot.as_str(), surface, sources);
            }
            Step::Unregister { slot } => {
                self.coordinator.unregister_slot(slot.as_str()).await;
            }
            Step::Activate {
                slot,
                muted,
                start_at,
                background,
            } => {
                let options = ActivateOptions {
                    muted: *muted,
                    start_at: *start_at,
                };
                if *background {
                    let coordinator = self.coordinator.clone();
                    let target = slot.clone();
                    let handle =
                        tokio::spawn(async move { coordinator.activate(target, options).await });
                    self.background.push((slot.clone(), handle));
                    // let the request enter the sequencer before the next step
                    tokio::task::yield_now().await;
                } else {
                    let outcome = self.coordinator.activate(slot.as_str(), options).await;
                    self.activations.push(ActivationRecord {
                        slot: slot.clone(),
                        outcome,
                    });
                }
            }
            Step::Deactivate => {
                self.coordinator.deactivate().await;
            }
            Step::PauseAll => self.coordinator.pause_all(),
            Step::SetMuted { muted } => self.coordinator.set_muted(*muted),
            Step::Hide => self.set_visibility(Visibility::Hidden).await,
            Step::Show => self.set_visibility(Visibility::Visible).await,
            Step::Stray { url } => {
                self.document.spawn_stray(url);
            }
            Step::RejectPlay { reject } => self.document.set_reject_play(*reject),
            Step::FailManifest { url } => self.document.fail_manifest(url),
            Step::FailSource { url } => self.document.fail_source(url),
            Step::Sleep { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Step::Destroy => {
                self.join_background().await?;
                self.coordinator.destroy().await;
            }
        }
        Ok(())
    }

    /// Publish a visibility change and wait until the coordinator saw it
    async fn set_visibility(&self, visibility: Visibility) {
        let hidden = visibility == Visibility::Hidden;
        let mut state = self.coordinator.subscribe_state();
        self.visibility.send_replace(visibility);
        let _ = state.wait_for(|s| s.hidden == hidden).await;
    }

    async fn join_background(&mut self) -> Result<()> {
        for (slot, handle) in self.background.drain(..) {
            let outcome = handle
                .await
                .map_err(|e| Error::Scenario(format!("activation of {} failed: {}", slot, e)))?;
            self.activations.push(ActivationRecord { slot, outcome });
        }
        Ok(())
    }
}

impl Drop for ScenarioRunner {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
