//! Frame-tick driver tying the store, both rigs, the engine and the gate together.
//!
//! The control rig is the loaded recording at the current frame; the user rig is
//! whatever [`MarkerSource`] the caller supplies (a live capture, or a second recording).

use crate::alignment::{AlignmentEngine, AlignmentSample, BoundRig};
use crate::config::{AlignmentSettings, SkeletonConfig};
use crate::error::LoadResult;
use crate::gate::{GateSignal, PlaybackGate};
use crate::humanoid;
use crate::parse::ParsedDataset;
use crate::rig::{MarkerSource, RecordedRig, RigBinding};
use crate::store::{LoadOutcome, LoadTicket, MarkerStore, PendingLoad, Presentation, ViewOption};
use crate::types::*;
use std::path::PathBuf;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Receives per-group feedback. Only groups with a complete sample are reported;
/// the others keep whatever they showed last.
pub trait FeedbackSink {
    fn set_group_color(&mut self, group: &str, color: Rgba);

    fn set_group_correction(&mut self, _group: &str, _correction: Option<Position>) {}
}

/// The playback clock's play/pause control.
pub trait PlaybackControl {
    fn set_playing(&mut self, playing: bool);
}

/// Everything computed for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame: Frame,
    /// Empty when the rigs weren't ready.
    pub samples: Vec<AlignmentSample>,
    pub signal: Option<GateSignal>,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

pub struct AlignmentSession<U: MarkerSource> {
    store: MarkerStore,
    skeleton: SkeletonConfig,
    engine: AlignmentEngine,
    gate: PlaybackGate,
    user: U,
    control_binding: Option<RigBinding>,
    user_binding: Option<RigBinding>,
}

impl<U: MarkerSource> AlignmentSession<U> {
    pub fn new(skeleton: SkeletonConfig, settings: AlignmentSettings, user: U) -> Self {
        let user_binding = Some(RigBinding::bind(&skeleton, &user));
        AlignmentSession {
            store: MarkerStore::new(),
            gate: PlaybackGate::new(&settings),
            engine: AlignmentEngine::new(settings),
            skeleton,
            user,
            control_binding: None,
            user_binding,
        }
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn skeleton(&self) -> &SkeletonConfig {
        &self.skeleton
    }

    pub fn settings(&self) -> &AlignmentSettings {
        self.engine.settings()
    }

    pub fn gate(&self) -> &PlaybackGate {
        &self.gate
    }

    pub fn user(&self) -> &U {
        &self.user
    }

    /// Positions may change freely; the marker set must not (use [`Self::set_user_rig`]).
    pub fn user_mut(&mut self) -> &mut U {
        &mut self.user
    }

    /// Both rigs have resolved the current skeleton.
    pub fn rig_is_ready(&self) -> bool {
        self.control_binding.is_some() && self.user_binding.is_some()
    }

    //////////////////////////////////////////// CONFIG ////////////////////////////////////////////

    pub fn subscribe_load_complete(&mut self, listener: impl FnMut(Frame) + 'static) {
        self.store.subscribe(listener);
    }

    pub fn set_skeleton(&mut self, skeleton: SkeletonConfig) {
        self.skeleton = skeleton;
        self.user_binding = Some(RigBinding::bind(&self.skeleton, &self.user));
        self.__bind_control();
    }

    pub fn set_user_rig(&mut self, user: U) {
        self.user = user;
        self.user_binding = Some(RigBinding::bind(&self.skeleton, &self.user));
    }

    pub fn set_settings(&mut self, settings: AlignmentSettings) {
        self.gate.configure(&settings);
        self.engine.set_settings(settings);
    }

    pub fn set_sync_enabled(&mut self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    pub fn set_view_option(&mut self, view: ViewOption) {
        self.store.set_view_option(view);
    }

    pub fn set_body_scale(&mut self, scale: f64) {
        self.store.set_body_scale(scale);
    }

    //////////////////////////////////////////// LOADING ////////////////////////////////////////////

    pub fn load_dataset(&mut self, dataset: ParsedDataset, presentation: &mut dyn Presentation) -> Frame {
        let frame_count = self.store.load(dataset, presentation);
        self.__bind_control();
        frame_count
    }

    pub fn load_file(
        &mut self,
        path: impl Into<PathBuf>,
        presentation: &mut dyn Presentation,
    ) -> LoadResult<Frame> {
        let frame_count = self.store.load_file(path, presentation)?;
        self.__bind_control();
        Ok(frame_count)
    }

    pub fn load_in_background(&mut self, path: impl Into<PathBuf>) -> PendingLoad {
        self.store.load_in_background(path)
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: LoadResult<ParsedDataset>,
        presentation: &mut dyn Presentation,
    ) -> LoadResult<LoadOutcome> {
        let outcome = self.store.finish_load(ticket, result, presentation)?;
        if let LoadOutcome::Loaded { .. } = outcome {
            self.__bind_control();
        }
        Ok(outcome)
    }

    fn __bind_control(&mut self) {
        if !self.store.is_loaded() {
            return;
        }
        let rig = RecordedRig::new(self.store.dataset().clone(), 1);
        self.control_binding = Some(RigBinding::bind(&self.skeleton, &rig));
    }

    //////////////////////////////////////////// TICK ////////////////////////////////////////////

    /// Scores every group of the recording at `frame` against the user rig.
    pub fn evaluate(&self, frame: Frame) -> Option<Vec<AlignmentSample>> {
        let (Some(control_binding), Some(user_binding)) = (&self.control_binding, &self.user_binding)
        else {
            return None;
        };
        let control = RecordedRig::new(self.store.dataset().clone(), frame);
        Some(self.engine.evaluate(
            BoundRig {
                binding: control_binding,
                source: &control,
            },
            BoundRig {
                binding: user_binding,
                source: &self.user,
            },
        ))
    }

    /// Handler for the playback driver's frame-advance event.
    pub fn on_frame_advance(
        &mut self,
        frame: Frame,
        presentation: &mut dyn Presentation,
        feedback: &mut dyn FeedbackSink,
        playback: &mut dyn PlaybackControl,
    ) -> TickReport {
        self.store.update_positions(frame, presentation);

        let samples = self.evaluate(frame);
        if let Some(samples) = &samples {
            for sample in samples {
                let Some(alignment) = sample.alignment() else {
                    continue;
                };
                feedback.set_group_color(&sample.group, self.engine.settings().color_for(alignment.score));
                feedback.set_group_correction(&sample.group, alignment.correction());
            }
        }

        let signal = self.gate.evaluate(samples.as_deref());
        match signal {
            Some(GateSignal::Pause) => playback.set_playing(false),
            Some(GateSignal::Resume) => playback.set_playing(true),
            None => {}
        }

        TickReport {
            frame,
            samples: samples.unwrap_or_default(),
            signal,
        }
    }

    /// Body-part anchors of the recording at `frame`, plus the offset that centres it.
    pub fn control_pose(&self, frame: Frame) -> (Vec<(&str, Option<Position>)>, Option<Position>) {
        let control = RecordedRig::new(self.store.dataset().clone(), frame);
        (
            humanoid::body_part_anchors(&self.skeleton.anchors, &control),
            humanoid::centering_offset(&self.skeleton.center_markers, &control),
        )
    }
}
