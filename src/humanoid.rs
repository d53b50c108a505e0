//! Places humanoid body parts from raw markers: each body part sits at the
//! mean of its markers, and the figure is centred on its pelvis in the ground plane.

use crate::rig::MarkerSource;
use crate::types::Position;
use crate::utils;
use serde::Deserialize;

/// Markers whose mean position locates one body part, e.g. the four head markers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnchorGroup {
    pub name: String,
    pub markers: Vec<String>,
}

impl AnchorGroup {
    pub fn new(name: &str, markers: &[&str]) -> Self {
        AnchorGroup {
            name: name.to_string(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Mean of the markers that have a sample; `None` if none do.
    pub fn anchor(&self, rig: &dyn MarkerSource) -> Option<Position> {
        let positions: Vec<Position> = self
            .markers
            .iter()
            .filter_map(|marker| rig.position_of(marker))
            .collect();
        utils::__mean_vector(&positions)
    }
}

pub fn body_part_anchors<'a>(
    anchors: &'a [AnchorGroup],
    rig: &dyn MarkerSource,
) -> Vec<(&'a str, Option<Position>)> {
    anchors
        .iter()
        .map(|group| (group.name.as_str(), group.anchor(rig)))
        .collect()
}

/// Offset that moves the centring markers' mean onto the vertical axis: `(-x, 0, -z)`.
/// `None` unless every centring marker has a sample.
pub fn centering_offset(markers: &[String], rig: &dyn MarkerSource) -> Option<Position> {
    let positions = markers
        .iter()
        .map(|marker| rig.position_of(marker))
        .collect::<Option<Vec<_>>>()?;
    let mean = utils::__mean_vector(&positions)?;
    Some(Position::new(-mean.x, 0.0, -mean.z))
}
