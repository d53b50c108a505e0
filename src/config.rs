//! Skeleton layout (connections, body-part groups, anchors) and alignment tuning.
//!
//! Both are plain data loaded once; the session applies changes on the next tick.

use crate::connections::{BodyPartGroup, Connection, ConnectionTable};
use crate::error::{ConfigError, ConfigResult};
use crate::humanoid::AnchorGroup;
use crate::types::{Rgba, GREEN, RED};
use cgmath::VectorSpace;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_STRICTNESS: f64 = 6.0;
pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_TOLERANCE: usize = 4;

/////////////////////////////////////////////////////////////////////////////////////////////////
// --- JSON deserialization types ---

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonConnection {
    Label(String),
    Explicit {
        name: Option<String>,
        head: String,
        tail: String,
    },
}

#[derive(Deserialize)]
struct JsonSkeleton {
    connections: Vec<JsonConnection>,
    #[serde(default)]
    groups: Vec<BodyPartGroup>,
    #[serde(default)]
    anchors: Vec<AnchorGroup>,
    #[serde(default)]
    center_markers: Vec<String>,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Connection table plus the groupings built on top of it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonConfig {
    pub table: ConnectionTable,
    pub groups: Vec<BodyPartGroup>,
    pub anchors: Vec<AnchorGroup>,
    pub center_markers: Vec<String>,
}

impl SkeletonConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let raw: JsonSkeleton = serde_json::from_str(json)?;

        let connections = raw
            .connections
            .into_iter()
            .map(|entry| match entry {
                JsonConnection::Label(label) => Connection::from_label(&label),
                JsonConnection::Explicit { name, head, tail } => {
                    let mut connection = Connection::new(&head, &tail);
                    if let Some(name) = name {
                        connection.name = name;
                    }
                    Ok(connection)
                }
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let table = ConnectionTable::new(connections);
        let groups = raw
            .groups
            .into_iter()
            .map(|mut group| {
                for member in &mut group.connections {
                    //// group members may use the namespaced label form too
                    if table.get(member).is_none() {
                        if let Ok(connection) = Connection::from_label(member) {
                            *member = connection.name;
                        }
                    }
                }
                group
            })
            .collect();

        Ok(SkeletonConfig {
            table,
            groups,
            anchors: raw.anchors,
            center_markers: raw.center_markers,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Layout for the Vicon Plug-in-Gait full-body marker set.
    pub fn plug_in_gait() -> Self {
        let groups = vec![
            // cross-checked cage over the four head markers
            BodyPartGroup::new(
                "head",
                &[
                    "LFHD - LBHD",
                    "LFHD - RBHD",
                    "RFHD - LBHD",
                    "RFHD - RBHD",
                    "LFHD - RFHD",
                    "LBHD - RBHD",
                ],
            ),
            BodyPartGroup::new(
                "hips",
                &["LASI - RASI", "LPSI - RPSI", "LASI - LPSI", "RASI - RPSI"],
            ),
            BodyPartGroup::new("left_wrist", &["LWRA - LFIN"]),
            BodyPartGroup::new("right_wrist", &["RWRA - RFIN"]),
            BodyPartGroup::new("left_elbow", &["LELB - LWRA", "LELB - LWRB"]),
            BodyPartGroup::new("right_elbow", &["RELB - RWRA", "RELB - RWRB"]),
            BodyPartGroup::new("left_arm", &["LSHO - LELB"]),
            BodyPartGroup::new("right_arm", &["RSHO - RELB"]),
            BodyPartGroup::new("left_knee", &["LKNE - LTIB", "LKNE - LANK"]),
            BodyPartGroup::new("right_knee", &["RKNE - RTIB", "RKNE - RANK"]),
            BodyPartGroup::new("left_foot", &["LHEE - LTOE", "LANK - LTOE"]),
            BodyPartGroup::new("right_foot", &["RHEE - RTOE", "RANK - RTOE"]),
        ];

        //// display-only segments joining the groups into one figure
        let extra = [
            "C7 - T10",
            "CLAV - STRN",
            "C7 - CLAV",
            "LSHO - CLAV",
            "RSHO - CLAV",
            "LASI - LTHI",
            "LTHI - LKNE",
            "RASI - RTHI",
            "RTHI - RKNE",
        ];

        let connections = groups
            .iter()
            .flat_map(|g| g.connections.iter().map(String::as_str))
            .chain(extra)
            .filter_map(|label| Connection::from_label(label).ok())
            .collect::<Vec<_>>();

        let anchors = vec![
            AnchorGroup::new("head", &["LFHD", "RFHD", "LBHD", "RBHD"]),
            AnchorGroup::new("hips", &["LASI", "RASI", "LPSI", "RPSI"]),
            AnchorGroup::new("left_wrist", &["LWRA", "LWRB"]),
            AnchorGroup::new("right_wrist", &["RWRA", "RWRB"]),
            AnchorGroup::new("left_elbow", &["LELB"]),
            AnchorGroup::new("right_elbow", &["RELB"]),
            AnchorGroup::new("left_arm", &["LSHO"]),
            AnchorGroup::new("right_arm", &["RSHO"]),
            AnchorGroup::new("left_knee", &["LKNE"]),
            AnchorGroup::new("right_knee", &["RKNE"]),
            AnchorGroup::new("left_foot", &["LANK", "LHEE", "LTOE"]),
            AnchorGroup::new("right_foot", &["RANK", "RHEE", "RTOE"]),
        ];

        SkeletonConfig {
            table: ConnectionTable::new(connections),
            groups,
            anchors,
            center_markers: ["LASI", "RASI", "LPSI", "RPSI"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Tuning for scoring and gating. Setters reject invalid values and keep the old one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlignmentSettings {
    strictness: f64,
    threshold: f64,
    tolerance: usize,
    matching_color: [f32; 4],
    deviating_color: [f32; 4],
    allow_partial_groups: bool,
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            strictness: DEFAULT_STRICTNESS,
            threshold: DEFAULT_THRESHOLD,
            tolerance: DEFAULT_TOLERANCE,
            matching_color: GREEN.into(),
            deviating_color: RED.into(),
            allow_partial_groups: false,
        }
    }
}

impl AlignmentSettings {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let settings: AlignmentSettings = serde_json::from_str(json)?;
        __check_strictness(settings.strictness)?;
        __check_threshold(settings.threshold)?;
        Ok(settings)
    }

    pub fn strictness(&self) -> f64 {
        self.strictness
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    pub fn allow_partial_groups(&self) -> bool {
        self.allow_partial_groups
    }

    pub fn matching_color(&self) -> Rgba {
        self.matching_color.into()
    }

    pub fn deviating_color(&self) -> Rgba {
        self.deviating_color.into()
    }

    pub fn set_strictness(&mut self, strictness: f64) -> ConfigResult<()> {
        __check_strictness(strictness)?;
        self.strictness = strictness;
        Ok(())
    }

    /// Free-text input from the UI; anything unparsable (or invalid) resets to the default.
    pub fn adjust_strictness(&mut self, input: &str) {
        self.strictness = match input.trim().parse::<f64>() {
            Ok(value) if __check_strictness(value).is_ok() => value,
            _ => DEFAULT_STRICTNESS,
        };
    }

    pub fn set_threshold(&mut self, threshold: f64) -> ConfigResult<()> {
        __check_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    pub fn set_tolerance(&mut self, tolerance: usize) {
        self.tolerance = tolerance;
    }

    pub fn set_allow_partial_groups(&mut self, allow: bool) {
        self.allow_partial_groups = allow;
    }

    pub fn set_colors(&mut self, matching: Rgba, deviating: Rgba) {
        self.matching_color = matching.into();
        self.deviating_color = deviating.into();
    }

    /// Deviating colour at 0, matching colour at 1.
    pub fn color_for(&self, score: f64) -> Rgba {
        let t = score.clamp(0.0, 1.0) as f32;
        self.deviating_color().lerp(self.matching_color(), t)
    }
}

fn __check_strictness(strictness: f64) -> ConfigResult<()> {
    if strictness.is_finite() && strictness > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting(format!(
            "strictness must be a positive number, got {strictness}"
        )))
    }
}

fn __check_threshold(threshold: f64) -> ConfigResult<()> {
    if threshold.is_finite() && (-1.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting(format!(
            "threshold must lie in [-1, 1], got {threshold}"
        )))
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plug_in_gait_groups_resolve_against_its_table() {
        let skeleton = SkeletonConfig::plug_in_gait();
        assert_eq!(skeleton.groups.len(), 12);
        for group in &skeleton.groups {
            for name in &group.connections {
                assert!(skeleton.table.resolve(name).is_ok(), "{name} missing");
            }
        }
        let head = &skeleton.groups[0];
        assert_eq!(head.connections.len(), 6);
    }

    #[test]
    fn json_accepts_labels_and_explicit_connections() {
        let json = r#"{
            "connections": [
                "LineRenderer: LFHD - LBHD",
                {"head": "RFHD", "tail": "RBHD"},
                {"name": "brow", "head": "LFHD", "tail": "RFHD"}
            ],
            "groups": [{"name": "head", "connections": ["LFHD - LBHD", "RFHD - RBHD", "brow"]}],
            "center_markers": ["LFHD"]
        }"#;
        let skeleton = SkeletonConfig::from_json_str(json).unwrap();
        assert_eq!(skeleton.table.len(), 3);
        assert_eq!(skeleton.table.resolve("brow").unwrap(), ("LFHD", "RFHD"));
        assert_eq!(skeleton.table.resolve("RFHD - RBHD").unwrap(), ("RFHD", "RBHD"));
        assert_eq!(skeleton.groups[0].connections.len(), 3);
        assert!(skeleton.anchors.is_empty());
    }

    #[test]
    fn group_members_accept_namespaced_labels() {
        let json = r#"{
            "connections": ["LineRenderer: A - B", {"name": "LineRenderer: C - D", "head": "C", "tail": "E"}],
            "groups": [{"name": "arm", "connections": ["LineRenderer: A - B", "LineRenderer: C - D"]}]
        }"#;
        let skeleton = SkeletonConfig::from_json_str(json).unwrap();
        let arm = &skeleton.groups[0];
        assert_eq!(arm.connections, vec!["A - B", "LineRenderer: C - D"]);
        assert_eq!(skeleton.table.resolve(&arm.connections[0]).unwrap(), ("A", "B"));
        assert_eq!(skeleton.table.resolve(&arm.connections[1]).unwrap(), ("C", "E"));
    }

    #[test]
    fn json_rejects_bad_label() {
        let err = SkeletonConfig::from_json_str(r#"{"connections": ["nonsense"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConnectionLabel(_)));

        let err = SkeletonConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn setters_keep_old_value_on_invalid_input() {
        let mut settings = AlignmentSettings::default();
        assert!(settings.set_strictness(0.0).is_err());
        assert!(settings.set_strictness(f64::NAN).is_err());
        assert_eq!(settings.strictness(), DEFAULT_STRICTNESS);

        assert!(settings.set_threshold(1.5).is_err());
        settings.set_threshold(0.5).unwrap();
        assert_eq!(settings.threshold(), 0.5);
    }

    #[test]
    fn adjust_strictness_falls_back_to_default() {
        let mut settings = AlignmentSettings::default();
        settings.adjust_strictness(" 2.5 ");
        assert_eq!(settings.strictness(), 2.5);
        settings.adjust_strictness("abc");
        assert_eq!(settings.strictness(), DEFAULT_STRICTNESS);
        settings.adjust_strictness("-1");
        assert_eq!(settings.strictness(), DEFAULT_STRICTNESS);
    }

    #[test]
    fn color_interpolates_and_clamps() {
        let settings = AlignmentSettings::default();
        assert_eq!(settings.color_for(1.0), GREEN);
        assert_eq!(settings.color_for(0.0), RED);
        assert_eq!(settings.color_for(7.0), GREEN);
        assert_eq!(settings.color_for(-3.0), RED);
        let mid = settings.color_for(0.5);
        assert!((mid.x - 0.5).abs() < 1e-6 && (mid.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn settings_json_is_validated() {
        let settings = AlignmentSettings::from_json_str(r#"{"tolerance": 2}"#).unwrap();
        assert_eq!(settings.tolerance(), 2);
        assert_eq!(settings.strictness(), DEFAULT_STRICTNESS);
        assert!(AlignmentSettings::from_json_str(r#"{"strictness": -2}"#).is_err());
    }
}
