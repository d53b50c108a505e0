//! Rigs: sources of marker positions for one tick, and connection bindings
//! resolved against them once when the rig is constructed.

use crate::config::SkeletonConfig;
use crate::parse::ParsedDataset;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Anything that can report marker positions for the current tick.
pub trait MarkerSource {
    fn marker_id(&self, name: &str) -> Option<MarkerId>;

    /// `None` when the marker has no sample right now.
    fn position(&self, id: MarkerId) -> Option<Position>;

    fn position_of(&self, name: &str) -> Option<Position> {
        self.position(self.marker_id(name)?)
    }
}

/// A recorded dataset viewed at one frame.
#[derive(Debug, Clone)]
pub struct RecordedRig {
    dataset: Arc<ParsedDataset>,
    frame: Frame,
}

impl RecordedRig {
    pub fn new(dataset: Arc<ParsedDataset>, frame: Frame) -> Self {
        RecordedRig { dataset, frame }
    }

    pub fn seek(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn dataset(&self) -> &Arc<ParsedDataset> {
        &self.dataset
    }
}

impl MarkerSource for RecordedRig {
    fn marker_id(&self, name: &str) -> Option<MarkerId> {
        self.dataset.marker_id(name)
    }

    fn position(&self, id: MarkerId) -> Option<Position> {
        self.dataset.position(id, self.frame)
    }
}

/// Positions pushed in from outside every tick, e.g. a live capture.
/// The marker set is fixed at construction so bindings stay valid.
#[derive(Debug, Clone, Default)]
pub struct LiveRig {
    index: HashMap<String, MarkerId>,
    positions: Vec<Option<Position>>,
}

impl LiveRig {
    pub fn new<S: Into<String>>(markers: impl IntoIterator<Item = S>) -> Self {
        let mut rig = LiveRig::default();
        for name in markers {
            let name = name.into();
            if rig.index.contains_key(&name) {
                continue;
            }
            rig.index.insert(name, MarkerId(rig.positions.len()));
            rig.positions.push(None);
        }
        rig
    }

    /// Returns `false` (and ignores the value) for a marker the rig doesn't know.
    pub fn set_position(&mut self, name: &str, position: Position) -> bool {
        match self.index.get(name) {
            Some(id) => {
                self.positions[id.0] = Some(position);
                true
            }
            None => false,
        }
    }

    pub fn clear_position(&mut self, name: &str) {
        if let Some(id) = self.index.get(name) {
            self.positions[id.0] = None;
        }
    }

    pub fn clear(&mut self) {
        self.positions.iter_mut().for_each(|p| *p = None);
    }
}

impl MarkerSource for LiveRig {
    fn marker_id(&self, name: &str) -> Option<MarkerId> {
        self.index.get(name).copied()
    }

    fn position(&self, id: MarkerId) -> Option<Position> {
        self.positions.get(id.0).copied().flatten()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A configuration name that couldn't be resolved against a rig.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    #[error("unknown connection {0:?}")]
    UnknownConnection(String),
    #[error("unknown marker {0:?}")]
    UnknownMarker(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundConnection {
    pub name: String,
    /// (head, tail)
    pub endpoints: Result<(MarkerId, MarkerId), Unresolved>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundGroup {
    pub name: String,
    pub connections: Vec<BoundConnection>,
}

/// Body-part groups with every connection resolved to marker ids on one rig.
/// Rebuilt when the rig or the skeleton changes; never per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RigBinding {
    groups: Vec<BoundGroup>,
}

impl RigBinding {
    pub fn bind(skeleton: &SkeletonConfig, rig: &dyn MarkerSource) -> Self {
        let resolve_marker = |name: &str| {
            rig.marker_id(name)
                .ok_or_else(|| Unresolved::UnknownMarker(name.to_string()))
        };

        let groups = skeleton
            .groups
            .iter()
            .map(|group| BoundGroup {
                name: group.name.clone(),
                connections: group
                    .connections
                    .iter()
                    .map(|name| {
                        let endpoints = match skeleton.table.resolve(name) {
                            Ok((head, tail)) => resolve_marker(head)
                                .and_then(|h| resolve_marker(tail).map(|t| (h, t))),
                            Err(_) => Err(Unresolved::UnknownConnection(name.clone())),
                        };
                        BoundConnection {
                            name: name.clone(),
                            endpoints,
                        }
                    })
                    .collect(),
            })
            .collect();

        RigBinding { groups }
    }

    pub fn groups(&self) -> &[BoundGroup] {
        &self.groups
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{BodyPartGroup, Connection, ConnectionTable};

    fn skeleton() -> SkeletonConfig {
        SkeletonConfig {
            table: ConnectionTable::new([Connection::new("A", "B"), Connection::new("B", "Z")]),
            groups: vec![
                BodyPartGroup::new("ok", &["A - B"]),
                BodyPartGroup::new("bad_marker", &["B - Z"]),
                BodyPartGroup::new("bad_connection", &["nope"]),
            ],
            ..SkeletonConfig::default()
        }
    }

    #[test]
    fn live_rig_reports_absence_until_set() {
        let mut rig = LiveRig::new(["A", "B"]);
        assert_eq!(rig.position_of("A"), None);
        assert!(rig.set_position("A", Position::new(1.0, 2.0, 3.0)));
        assert!(!rig.set_position("Q", Position::new(1.0, 2.0, 3.0)));
        assert_eq!(rig.position_of("A"), Some(Position::new(1.0, 2.0, 3.0)));
        rig.clear_position("A");
        assert_eq!(rig.position_of("A"), None);
        assert_eq!(rig.position_of("Q"), None);
    }

    #[test]
    fn binding_resolves_names_once() {
        let rig = LiveRig::new(["A", "B"]);
        let binding = RigBinding::bind(&skeleton(), &rig);
        let groups = binding.groups();

        assert_eq!(groups[0].connections[0].endpoints, Ok((MarkerId(0), MarkerId(1))));
        assert_eq!(
            groups[1].connections[0].endpoints,
            Err(Unresolved::UnknownMarker("Z".to_string()))
        );
        assert_eq!(
            groups[2].connections[0].endpoints,
            Err(Unresolved::UnknownConnection("nope".to_string()))
        );
    }
}
