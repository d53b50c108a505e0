//! Per-tick comparison of two rigs, one body-part group at a time.
//!
//! For every group the displacement (tail - head) of each connection is taken on
//! both rigs, averaged per rig, and the two means are compared by cosine
//! similarity. The similarity is clamped to [0, 1] and raised to `strictness`
//! to give the feedback score.

use crate::config::AlignmentSettings;
use crate::rig::{BoundGroup, MarkerSource, RigBinding, Unresolved};
use crate::types::*;
use crate::utils;
use cgmath::Zero;
use thiserror::Error;
use tracing::{debug, warn};

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Why a group produced no signal this tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IncompleteReason {
    /// Configuration names something the rig doesn't have.
    #[error("{0}")]
    Unresolved(Unresolved),
    /// A connection endpoint has no sample at this frame.
    #[error("no sample for connection {connection:?}")]
    MissingSample { connection: String },
    /// The group has no usable connections.
    #[error("no resolvable connections")]
    NoConnections,
    /// A group mean has zero length, so it has no direction.
    #[error("zero-length mean displacement")]
    DegenerateVector,
    /// The two rigs were bound from different group layouts.
    #[error("rigs bound to different layouts")]
    LayoutMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupAlignment {
    pub control_mean: Position,
    pub user_mean: Position,
    /// Cosine similarity in [-1, 1].
    pub similarity: f64,
    /// `clamp(similarity, 0, 1) ^ strictness`
    pub score: f64,
    pub connections_used: usize,
}

impl GroupAlignment {
    /// Direction the user's body part has to move to match the control, for arrow cues.
    pub fn correction(&self) -> Option<Position> {
        let difference = self.control_mean - self.user_mean;
        (!difference.is_zero()).then_some(difference)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Complete(GroupAlignment),
    Incomplete(IncompleteReason),
}

/// One group's result for one tick. Not kept across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentSample {
    pub group: String,
    pub outcome: SampleOutcome,
}

impl AlignmentSample {
    pub fn alignment(&self) -> Option<&GroupAlignment> {
        match &self.outcome {
            SampleOutcome::Complete(alignment) => Some(alignment),
            SampleOutcome::Incomplete(_) => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.alignment().is_some()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Cosine similarity of two displacement vectors. `None` if either is zero.
pub fn cosine_similarity(control: Position, user: Position) -> Option<f64> {
    utils::__cosine(control, user)
}

/// Feedback score. Negative similarities are clamped to 0 before exponentiation.
pub fn alignment_score(similarity: f64, strictness: f64) -> f64 {
    similarity.clamp(0.0, 1.0).powf(strictness)
}

/// A rig binding together with the source it was bound against.
#[derive(Clone, Copy)]
pub struct BoundRig<'a> {
    pub binding: &'a RigBinding,
    pub source: &'a dyn MarkerSource,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Default)]
pub struct AlignmentEngine {
    settings: AlignmentSettings,
}

impl AlignmentEngine {
    pub fn new(settings: AlignmentSettings) -> Self {
        AlignmentEngine { settings }
    }

    pub fn settings(&self) -> &AlignmentSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AlignmentSettings) {
        self.settings = settings;
    }

    /// One sample per group of the control binding, in configuration order.
    pub fn evaluate(&self, control: BoundRig, user: BoundRig) -> Vec<AlignmentSample> {
        let control_groups = control.binding.groups();
        let user_groups = user.binding.groups();

        control_groups
            .iter()
            .enumerate()
            .map(|(i, control_group)| {
                let outcome = match user_groups.get(i) {
                    Some(user_group) if user_group.name == control_group.name => self
                        .__evaluate_group(control_group, control.source, user_group, user.source),
                    _ => Err(IncompleteReason::LayoutMismatch),
                };

                let outcome = match outcome {
                    Ok(alignment) => SampleOutcome::Complete(alignment),
                    Err(reason) => {
                        match &reason {
                            IncompleteReason::Unresolved(_) | IncompleteReason::LayoutMismatch => {
                                warn!(group = %control_group.name, %reason, "group excluded from scoring")
                            }
                            _ => debug!(group = %control_group.name, %reason, "group incomplete"),
                        }
                        SampleOutcome::Incomplete(reason)
                    }
                };

                AlignmentSample {
                    group: control_group.name.clone(),
                    outcome,
                }
            })
            .collect()
    }

    fn __evaluate_group(
        &self,
        control_group: &BoundGroup,
        control: &dyn MarkerSource,
        user_group: &BoundGroup,
        user: &dyn MarkerSource,
    ) -> Result<GroupAlignment, IncompleteReason> {
        if control_group.connections.len() != user_group.connections.len() {
            return Err(IncompleteReason::LayoutMismatch);
        }

        let mut control_displacements = Vec::with_capacity(control_group.connections.len());
        let mut user_displacements = Vec::with_capacity(user_group.connections.len());

        for (c, u) in control_group.connections.iter().zip(&user_group.connections) {
            //// configuration problems always exclude the whole group
            let control_ends = c.endpoints.clone().map_err(IncompleteReason::Unresolved)?;
            let user_ends = u.endpoints.clone().map_err(IncompleteReason::Unresolved)?;

            let displacements = (
                __displacement(control, control_ends),
                __displacement(user, user_ends),
            );
            match displacements {
                (Some(control_displacement), Some(user_displacement)) => {
                    control_displacements.push(control_displacement);
                    user_displacements.push(user_displacement);
                }
                _ if self.settings.allow_partial_groups() => continue,
                _ => {
                    return Err(IncompleteReason::MissingSample {
                        connection: c.name.clone(),
                    })
                }
            }
        }

        let (Some(control_mean), Some(user_mean)) = (
            utils::__mean_vector(&control_displacements),
            utils::__mean_vector(&user_displacements),
        ) else {
            return Err(IncompleteReason::NoConnections);
        };

        let similarity =
            cosine_similarity(control_mean, user_mean).ok_or(IncompleteReason::DegenerateVector)?;

        Ok(GroupAlignment {
            control_mean,
            user_mean,
            similarity,
            score: alignment_score(similarity, self.settings.strictness()),
            connections_used: control_displacements.len(),
        })
    }
}

fn __displacement(rig: &dyn MarkerSource, (head, tail): (MarkerId, MarkerId)) -> Option<Position> {
    Some(rig.position(tail)? - rig.position(head)?)
}

/////////////////////////////////////////////////////////////////////////////////////////////////
