//! Loads marker-trajectory exports and scores, frame by frame, how well a
//! second rig lines up with the recording, body part by body part.
//!
//! ```no_run
//! use mocap_align::prelude::*;
//!
//! let dataset = load_dataset_from_file("./squat.csv").unwrap();
//! let lfhd = dataset.position_at_frame("LFHD", 1);
//! ```

pub mod alignment;
pub mod config;
pub mod connections;
pub mod error;
pub mod gate;
pub mod humanoid;
pub mod parse;
pub mod rig;
pub mod session;
pub mod store;
pub mod types;
mod utils;

#[cfg(feature = "visualize")]
pub mod visualize;

pub mod prelude {
    pub use crate::alignment::{
        alignment_score, cosine_similarity, AlignmentEngine, AlignmentSample, BoundRig,
        GroupAlignment, IncompleteReason, SampleOutcome,
    };
    pub use crate::config::{AlignmentSettings, SkeletonConfig};
    pub use crate::connections::{BodyPartGroup, Connection, ConnectionTable};
    pub use crate::error::{ConfigError, FormatReason, LoadError};
    pub use crate::gate::{GateSignal, PlaybackGate, SyncState};
    pub use crate::humanoid::AnchorGroup;
    pub use crate::parse::{load_dataset_from_file, load_dataset_from_string, MarkerSeries, ParsedDataset};
    pub use crate::rig::{LiveRig, MarkerSource, RecordedRig, RigBinding};
    pub use crate::session::{AlignmentSession, FeedbackSink, PlaybackControl, TickReport};
    pub use crate::store::{
        LoadOutcome, LoadTicket, MarkerStore, NoPresentation, PendingLoad, Presentation, ViewOption,
    };
    pub use crate::types::{Frame, MarkerId, PointHandle, Position, Rgba};
}
