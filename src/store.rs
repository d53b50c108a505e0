//! Owns the loaded dataset and the presentation points created for its markers.
//!
//! A load builds the whole dataset first and swaps it in afterwards, so readers
//! only ever see the old or the new one. Readers that need to outlive a reload
//! hold on to the `Arc` returned by [`MarkerStore::dataset`].

use crate::error::{LoadError, LoadResult};
use crate::parse::{load_dataset_from_file, ParsedDataset};
use crate::types::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::info;

pub const DEFAULT_BODY_SCALE: f64 = 0.001;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Display side of the store: one visual point per marker, addressed by handle.
pub trait Presentation {
    fn create_point(&mut self, handle: PointHandle, marker: &str);
    fn destroy_point(&mut self, handle: PointHandle);
    fn update_point(&mut self, handle: PointHandle, position: Position, visible: bool);
}

/// Presentation that draws nothing, for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresentation;

impl Presentation for NoPresentation {
    fn create_point(&mut self, _handle: PointHandle, _marker: &str) {}
    fn destroy_point(&mut self, _handle: PointHandle) {}
    fn update_point(&mut self, _handle: PointHandle, _position: Position, _visible: bool) {}
}

/// Marker points are shown in the exoskeleton view and hidden behind the humanoid model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewOption {
    #[default]
    Humanoid,
    Exoskeleton,
}

/// Identifies one load attempt. Only the most recently issued ticket can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { frame_count: Frame },
    /// A newer load was started before this one finished.
    Discarded,
}

/// A parse running on a worker thread.
#[derive(Debug)]
pub struct PendingLoad {
    ticket: LoadTicket,
    worker: JoinHandle<LoadResult<ParsedDataset>>,
}

impl PendingLoad {
    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the parse is done.
    pub fn wait(self) -> (LoadTicket, LoadResult<ParsedDataset>) {
        let result = self.worker.join().unwrap_or_else(|_| {
            Err(LoadError::Io(std::io::Error::other("loader thread panicked")))
        });
        (self.ticket, result)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

pub struct MarkerStore {
    dataset: Arc<ParsedDataset>,
    points: Vec<PointHandle>, // indexed by MarkerId
    next_handle: u64,
    generation: u64,
    loaded: bool,
    view: ViewOption,
    body_scale: f64,
    listeners: Vec<Box<dyn FnMut(Frame)>>,
}

impl Default for MarkerStore {
    fn default() -> Self {
        MarkerStore {
            dataset: Arc::new(ParsedDataset::default()),
            points: Vec::new(),
            next_handle: 0,
            generation: 0,
            loaded: false,
            view: ViewOption::default(),
            body_scale: DEFAULT_BODY_SCALE,
            listeners: Vec::new(),
        }
    }
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the new frame count after every successful load.
    pub fn subscribe(&mut self, listener: impl FnMut(Frame) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    //////////////////////////////////////////// LOADING ////////////////////////////////////////////

    /// Starts a load attempt; any attempt started earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Parses `path` on a worker thread. Complete it with [`MarkerStore::finish_load`].
    pub fn load_in_background(&mut self, path: impl Into<PathBuf>) -> PendingLoad {
        let path = path.into();
        PendingLoad {
            ticket: self.begin_load(),
            worker: thread::spawn(move || load_dataset_from_file(path)),
        }
    }

    /// Adopts `result` if `ticket` is still current. Errors leave the previous dataset in place.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: LoadResult<ParsedDataset>,
        presentation: &mut dyn Presentation,
    ) -> LoadResult<LoadOutcome> {
        if ticket.0 != self.generation {
            info!(ticket = ticket.0, current = self.generation, "discarding stale load");
            return Ok(LoadOutcome::Discarded);
        }
        let frame_count = self.__adopt(result?, presentation);
        Ok(LoadOutcome::Loaded { frame_count })
    }

    /// Parses and adopts `path` synchronously.
    pub fn load_file(
        &mut self,
        path: impl Into<PathBuf>,
        presentation: &mut dyn Presentation,
    ) -> LoadResult<Frame> {
        let ticket = self.begin_load();
        let result = load_dataset_from_file(path.into());
        match self.finish_load(ticket, result, presentation)? {
            LoadOutcome::Loaded { frame_count } => Ok(frame_count),
            LoadOutcome::Discarded => Ok(self.frame_count()),
        }
    }

    /// Adopts an already parsed dataset, superseding any pending load.
    pub fn load(&mut self, dataset: ParsedDataset, presentation: &mut dyn Presentation) -> Frame {
        self.begin_load();
        self.__adopt(dataset, presentation)
    }

    fn __adopt(&mut self, dataset: ParsedDataset, presentation: &mut dyn Presentation) -> Frame {
        //// release the old points before creating any new ones
        for handle in self.points.drain(..) {
            presentation.destroy_point(handle);
        }

        let mut points = Vec::with_capacity(dataset.marker_count());
        for (_, series) in dataset.markers() {
            let handle = PointHandle(self.next_handle);
            self.next_handle += 1;
            presentation.create_point(handle, series.name());
            points.push(handle);
        }

        self.points = points;
        self.dataset = Arc::new(dataset);
        self.loaded = true;

        let frame_count = self.dataset.frame_count();
        info!(
            markers = self.dataset.marker_count(),
            frames = frame_count,
            "marker store replaced"
        );
        for listener in self.listeners.iter_mut() {
            listener(frame_count);
        }
        frame_count
    }

    //////////////////////////////////////////// QUERIES ////////////////////////////////////////////

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn dataset(&self) -> &Arc<ParsedDataset> {
        &self.dataset
    }

    pub fn frame_count(&self) -> Frame {
        self.dataset.frame_count()
    }

    /// Never fails: unknown markers and dropouts are both `None`.
    pub fn position_at_frame(&self, marker: &str, frame: Frame) -> Option<Position> {
        self.dataset.position_at_frame(marker, frame)
    }

    pub fn all_marker_names(&self) -> BTreeSet<&str> {
        self.dataset.marker_names().collect()
    }

    pub fn point_handle(&self, marker: &str) -> Option<PointHandle> {
        let id = self.dataset.marker_id(marker)?;
        self.points.get(id.0).copied()
    }

    //////////////////////////////////////////// DISPLAY ////////////////////////////////////////////

    pub fn view_option(&self) -> ViewOption {
        self.view
    }

    pub fn set_view_option(&mut self, view: ViewOption) {
        self.view = view;
    }

    pub fn body_scale(&self) -> f64 {
        self.body_scale
    }

    pub fn set_body_scale(&mut self, scale: f64) {
        self.body_scale = scale;
    }

    /// Pushes every marker's scaled position at `frame`. Markers without a sample keep their last position.
    pub fn update_positions(&self, frame: Frame, presentation: &mut dyn Presentation) {
        if !self.loaded {
            return;
        }
        let visible = self.view == ViewOption::Exoskeleton;
        for (id, series) in self.dataset.markers() {
            let Some(position) = series.position_at(frame) else {
                continue;
            };
            presentation.update_point(self.points[id.0], position * self.body_scale, visible);
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////
