//! Scripted timelines replayed through a [`Stage`] of simulated anchors.
//!
//! A scenario is a TOML file with a list of timed steps:
//!
//! ```toml
//! tick_ms = 16.666            # optional, falls back to the config
//!
//! [[step]]
//! at_ms = 0
//! action = "start"
//!
//! [[step]]
//! at_ms = 100
//! action = "pose"
//! target = 0
//! position = [0.0, 0.0, -1.0]
//!
//! [[step]]
//! at_ms = 100
//! action = "found"
//! target = 0
//!
//! [[step]]
//! at_ms = 1000
//! action = "lost"
//! target = 0
//!
//! [[step]]
//! at_ms = 12000
//! action = "wait"
//! ```
//!
//! Steps due at or before a frame are applied before that frame's tick, in
//! file order. `pose` and `viewer` steps update the simulated tracker;
//! `start`, `found`, `lost` and `contacts` are published on the bus exactly
//! as a host would.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use sticky_hal::sim::{SimNode, SimTracker};
use sticky_middleware::{Subscription, Topic};
use sticky_runtime::{AnchorSnapshot, Stage};
use sticky_types::{Contact, Event, EventPayload, PoseSample, PresenceState, Quat, Vec3};
use tracing::debug;

use crate::config::{AnchorEntry, Config};

// ────────────────────────────────────────────────────────────────────────────
// File format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub tick_ms: Option<f64>,
    /// Replaces the configured anchors when present.
    pub anchors: Option<Vec<AnchorEntry>>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: f64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    Start,
    Found {
        target: u32,
    },
    Lost {
        target: u32,
    },
    Pose {
        target: u32,
        position: [f32; 3],
        /// `[w, x, y, z]`, identity when omitted.
        rotation: Option<[f32; 4]>,
        scale: Option<[f32; 3]>,
    },
    /// Clear the tracker's pose (no sample this frame onwards).
    NoPose {
        target: u32,
    },
    Viewer {
        target: u32,
        position: [f32; 3],
    },
    Contacts {
        #[serde(default)]
        contacts: Vec<ContactSpec>,
    },
    Wait,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContactSpec {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

impl Action {
    fn target(&self) -> Option<u32> {
        match self {
            Action::Found { target }
            | Action::Lost { target }
            | Action::Pose { target, .. }
            | Action::NoPose { target }
            | Action::Viewer { target, .. } => Some(*target),
            Action::Start | Action::Contacts { .. } | Action::Wait => None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario at {}: {}", path.display(), e))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| format!("Failed to parse scenario: {}", e))
    }

    /// Time of the last step.
    pub fn duration_ms(&self) -> f64 {
        self.steps.iter().map(|s| s.at_ms).fold(0.0, f64::max)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Replay output
// ────────────────────────────────────────────────────────────────────────────

/// One presence transition observed during replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub at_ms: f64,
    pub anchor: String,
    pub target: u32,
    pub from: PresenceState,
    pub to: PresenceState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub ticks: u64,
    pub interrupted: bool,
    pub transitions: Vec<TransitionRecord>,
    pub anchors: Vec<AnchorSnapshot>,
}

// ────────────────────────────────────────────────────────────────────────────
// Replay
// ────────────────────────────────────────────────────────────────────────────

/// A scenario wired to a stage of simulated anchors.
#[derive(Debug)]
pub struct Replay {
    stage: Stage,
    presence: Subscription,
    trackers: HashMap<u32, SimTracker>,
    names: HashMap<u32, String>,
    steps: Vec<Step>,
    tick_ms: f64,
    end_ms: f64,
}

impl Replay {
    /// Build the stage. Fails if the scenario refers to a target no anchor
    /// follows, or if the tick period is not positive.
    pub fn new(scenario: Scenario, config: &Config) -> Result<Self, String> {
        let tick_ms = scenario.tick_ms.unwrap_or(config.tick_ms);
        if !(tick_ms.is_finite() && tick_ms > 0.0) {
            return Err(format!("tick_ms must be positive, got {tick_ms}"));
        }
        let anchors = scenario.anchors.clone().unwrap_or_else(|| config.anchors.clone());
        if anchors.is_empty() {
            return Err("no anchors configured".to_string());
        }

        let mut stage = Stage::default();
        let presence = stage.bus().subscribe_to(Topic::Presence);
        let mut trackers = HashMap::new();
        let mut names = HashMap::new();
        for entry in &anchors {
            if names.contains_key(&entry.target) {
                return Err(format!("target {} is followed by two anchors", entry.target));
            }
            let tracker = SimTracker::new(entry.target);
            stage.add_anchor(
                entry.name.clone(),
                entry.target,
                config.anchor.clone(),
                Box::new(tracker.clone()),
                Box::new(SimNode::new(entry.name.clone())),
            );
            trackers.insert(entry.target, tracker);
            names.insert(entry.target, entry.name.clone());
        }

        if let Some(step) = scenario
            .steps
            .iter()
            .find(|s| s.action.target().is_some_and(|t| !names.contains_key(&t)))
        {
            return Err(format!(
                "step at {} ms refers to unknown target {:?}",
                step.at_ms,
                step.action.target()
            ));
        }

        let end_ms = scenario.duration_ms();
        let mut steps = scenario.steps;
        // Stable: steps sharing a timestamp keep their file order.
        steps.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));

        Ok(Self {
            stage,
            presence,
            trackers,
            names,
            steps,
            tick_ms,
            end_ms,
        })
    }

    /// Run to the end of the timeline, or until `stop` is raised. `on_change`
    /// sees every transition as it happens.
    pub fn run(
        mut self,
        stop: &AtomicBool,
        mut on_change: impl FnMut(&TransitionRecord),
    ) -> ReplayReport {
        let mut transitions = Vec::new();
        let mut next_step = 0;
        let mut ticks = 0u64;
        let mut interrupted = false;
        let mut now = 0.0;

        loop {
            if stop.load(Ordering::SeqCst) {
                interrupted = true;
                break;
            }

            while next_step < self.steps.len() && self.steps[next_step].at_ms <= now {
                let step = self.steps[next_step].clone();
                self.apply(&step);
                next_step += 1;
            }

            let dt = if ticks == 0 { 0.0 } else { self.tick_ms as f32 };
            self.stage.tick(now, dt);
            ticks += 1;

            for event in self.presence.drain() {
                if let EventPayload::PresenceChanged { target, from, to } = event.payload {
                    let record = TransitionRecord {
                        at_ms: now,
                        anchor: self.names.get(&target).cloned().unwrap_or_default(),
                        target,
                        from,
                        to,
                    };
                    on_change(&record);
                    transitions.push(record);
                }
            }

            if now >= self.end_ms && next_step >= self.steps.len() {
                break;
            }
            now += self.tick_ms;
        }

        let anchors = self.stage.snapshots();
        self.stage.shutdown();
        ReplayReport {
            ticks,
            interrupted,
            transitions,
            anchors,
        }
    }

    fn apply(&mut self, step: &Step) {
        debug!(at_ms = step.at_ms, action = ?step.action, "replay step");
        match &step.action {
            Action::Start => self.publish(Topic::Lifecycle, EventPayload::ExperienceStarted),
            Action::Found { target } => {
                self.publish(Topic::Tracking, EventPayload::TrackingFound { target: *target })
            }
            Action::Lost { target } => {
                self.publish(Topic::Tracking, EventPayload::TrackingLost { target: *target })
            }
            Action::Pose {
                target,
                position,
                rotation,
                scale,
            } => {
                let [w, x, y, z] = rotation.unwrap_or([1.0, 0.0, 0.0, 0.0]);
                let [sx, sy, sz] = scale.unwrap_or([1.0, 1.0, 1.0]);
                let sample = PoseSample::new(
                    vec3(*position),
                    Quat::new(w, x, y, z),
                    Vec3::new(sx, sy, sz),
                    step.at_ms,
                );
                if let Some(tracker) = self.trackers.get(target) {
                    tracker.set_pose(Some(sample));
                }
            }
            Action::NoPose { target } => {
                if let Some(tracker) = self.trackers.get(target) {
                    tracker.set_pose(None);
                }
            }
            Action::Viewer { target, position } => {
                if let Some(tracker) = self.trackers.get(target) {
                    tracker.set_viewer(vec3(*position));
                }
            }
            Action::Contacts { contacts } => {
                let contacts = contacts.iter().map(|c| Contact::new(c.id, c.x, c.y)).collect();
                self.publish(Topic::Pointer, EventPayload::ContactsChanged(contacts));
            }
            Action::Wait => {}
        }
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Err(e) = self.stage.bus().publish_to(topic, Event::new("sticky-cli::replay", payload)) {
            debug!(error = %e, "replay publish failed");
        }
    }
}

fn vec3([x, y, z]: [f32; 3]) -> Vec3 {
    Vec3::new(x, y, z)
}
