use crate::error::{FormatReason, LoadError, LoadResult};
use crate::types::*;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::iter::Enumerate;
use std::path::Path;
use std::str::Lines;
use std::sync::OnceLock;
use tracing::{debug, info};

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Time series of one marker: frame number -> position (already axis-swapped).
/// Frames may have gaps where the marker dropped out.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSeries {
    name: String,
    samples: BTreeMap<Frame, Position>,
}

impl MarkerSeries {
    pub fn new(name: impl Into<String>) -> Self {
        MarkerSeries {
            name: name.into(),
            samples: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` on dropout; never a default position.
    pub fn position_at(&self, frame: Frame) -> Option<Position> {
        self.samples.get(&frame).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in ascending frame order.
    pub fn iter(&self) -> impl Iterator<Item = (Frame, Position)> + '_ {
        self.samples.iter().map(|(&frame, &position)| (frame, position))
    }

    pub(crate) fn insert(&mut self, frame: Frame, position: Position) {
        self.samples.insert(frame, position);
    }
}

/// Result of parsing one export. Immutable once built; a reload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedDataset {
    titles: Vec<String>,
    markers: Vec<MarkerSeries>,
    index: HashMap<String, MarkerId>,
    frame_count: Frame,
}

impl ParsedDataset {
    /// Marker titles in header order (including markers that never got a valid sample).
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Highest valid frame index seen, not the number of rows.
    pub fn frame_count(&self) -> Frame {
        self.frame_count
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &MarkerSeries)> {
        self.markers
            .iter()
            .enumerate()
            .map(|(i, series)| (MarkerId(i), series))
    }

    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(|series| series.name())
    }

    pub fn marker_id(&self, name: &str) -> Option<MarkerId> {
        self.index.get(name).copied()
    }

    pub fn marker(&self, name: &str) -> Option<&MarkerSeries> {
        self.marker_id(name).and_then(|id| self.series(id))
    }

    pub fn series(&self, id: MarkerId) -> Option<&MarkerSeries> {
        self.markers.get(id.0)
    }

    pub fn position(&self, id: MarkerId, frame: Frame) -> Option<Position> {
        self.series(id)?.position_at(frame)
    }

    pub fn position_at_frame(&self, name: &str, frame: Frame) -> Option<Position> {
        self.marker(name)?.position_at(frame)
    }

    fn series_mut(&mut self, name: &str) -> &mut MarkerSeries {
        let id = match self.index.get(name) {
            Some(&id) => id,
            None => {
                let id = MarkerId(self.markers.len());
                self.markers.push(MarkerSeries::new(name));
                self.index.insert(name.to_string(), id);
                id
            }
        };
        &mut self.markers[id.0]
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// `namespace:NAME` -> `NAME` (the segment right after the first colon).
fn __title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^:]*:([^:]*)").expect("title pattern is a valid regex"))
}

fn __parse_titles(line: &str, line_number: usize) -> LoadResult<Vec<String>> {
    let mut titles = Vec::new();
    for token in line.split(',') {
        // empty cells between marker titles
        if token.chars().count() < 2 {
            continue;
        }
        match __title_pattern().captures(token).and_then(|c| c.get(1)) {
            Some(name) => titles.push(name.as_str().to_string()),
            None => {
                return Err(LoadError::Format {
                    line: line_number,
                    reason: FormatReason::MalformedTitle(token.to_string()),
                })
            }
        }
    }
    Ok(titles)
}

/// Walks the header skeleton and returns the marker titles. Leaves the iterator on the first data row.
///
/// Layout: junk lines, two delimiter lines (< 2 chars), a units/count line, the title line,
/// a units-per-column line. Short lines after the second delimiter are still skipped.
fn __read_header(lines: &mut Enumerate<Lines>) -> LoadResult<Vec<String>> {
    let mut delimiters = 0;
    let mut last_line = 0;

    while let Some((i, line)) = lines.next() {
        last_line = i + 1;
        if line.chars().count() < 2 {
            delimiters += 1;
            continue;
        }
        if delimiters < 2 {
            continue;
        }

        //// `line` is the units/count line, the title line follows
        let Some((title_index, title_line)) = lines.next() else {
            break;
        };
        let titles = __parse_titles(title_line, title_index + 1)?;

        //// units per column
        lines.next();
        return Ok(titles);
    }

    Err(LoadError::Format {
        line: last_line,
        reason: FormatReason::NoDataSection,
    })
}

fn __parse_frame(cell: &str) -> Option<Frame> {
    match cell.trim().parse::<i64>() {
        Ok(frame) if frame >= 1 => Frame::try_from(frame).ok(),
        _ => None,
    }
}

fn __parse_coordinate(cells: &[&str], column: Index) -> Option<f64> {
    let value = cells.get(column)?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Reads the x, y, z cells of one marker and swaps to (x, z, y).
/// The export is Z-up while positions are stored Y-up.
fn __parse_position(cells: &[&str], marker: Index) -> Option<Position> {
    let x = __parse_coordinate(cells, 2 + marker * 3)?;
    let y = __parse_coordinate(cells, 3 + marker * 3)?;
    let z = __parse_coordinate(cells, 4 + marker * 3)?;
    Some(Position::new(x, z, y))
}

fn parse_dataset(lines: Lines) -> LoadResult<ParsedDataset> {
    let mut it = lines.enumerate();
    let titles = __read_header(&mut it)?;

    let mut dataset = ParsedDataset {
        titles,
        ..ParsedDataset::default()
    };
    let titles = dataset.titles.clone();

    /////////////////////////////////// PARSING ROWS ///////////////////////////////////
    let mut skipped_rows = 0usize;
    for (i, line) in it {
        let cells: Vec<&str> = line.split(',').collect();

        //// column 0 is the frame, column 1 the (unused) sub-frame
        let Some(frame) = __parse_frame(cells[0]) else {
            skipped_rows += 1;
            debug!(line = i + 1, "skipping row without a valid frame index");
            continue;
        };
        dataset.frame_count = dataset.frame_count.max(frame);

        for (marker, title) in titles.iter().enumerate() {
            // a bad triple only drops this marker for this row
            if let Some(position) = __parse_position(&cells, marker) {
                dataset.series_mut(title).insert(frame, position);
            }
        }
    }

    info!(
        markers = dataset.marker_count(),
        frames = dataset.frame_count,
        skipped_rows,
        "parsed motion export"
    );
    Ok(dataset)
}

//////////////////////////////////////////////////////////////// PUBLIC ////////////////////////////////////////////////////////////////

/// load a marker export from a file path. Bytes that aren't UTF-8 are replaced, not rejected.
pub fn load_dataset_from_file(file_path: impl AsRef<Path>) -> LoadResult<ParsedDataset> {
    let bytes = std::fs::read(file_path)?;
    load_dataset_from_string(&String::from_utf8_lossy(&bytes))
}

/// load a marker export from a string
pub fn load_dataset_from_string(contents: &str) -> LoadResult<ParsedDataset> {
    parse_dataset(contents.lines())
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Trajectories\nx\n\n100\n,,Label:LFHD,,,Label:RFHD,,\nFrame,Sub Frame,X,Y,Z,X,Y,Z\n";

    #[test]
    fn parses_two_markers_with_axis_swap() {
        let text = "x\n.\nskip\nLabel:LFHD,Label:RFHD\nskip\n1,0,1.0,2.0,3.0,4.0,5.0,6.0\n";
        let dataset = load_dataset_from_string(text).unwrap();

        assert_eq!(dataset.titles(), &["LFHD".to_string(), "RFHD".to_string()]);
        assert_eq!(dataset.frame_count(), 1);
        assert_eq!(
            dataset.position_at_frame("LFHD", 1),
            Some(Position::new(1.0, 3.0, 2.0))
        );
        assert_eq!(
            dataset.position_at_frame("RFHD", 1),
            Some(Position::new(4.0, 6.0, 5.0))
        );
    }

    #[test]
    fn junk_before_second_delimiter_is_ignored() {
        let text = format!("{HEADER}1,0,1,2,3,4,5,6\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert_eq!(dataset.marker_count(), 2);
        assert_eq!(dataset.position_at_frame("RFHD", 1), Some(Position::new(4.0, 6.0, 5.0)));
    }

    #[test]
    fn invalid_frame_rows_do_not_count() {
        let text = format!("{HEADER},,mm,mm,mm\nabc,0,9,9,9,9,9,9\n0,0,9,9,9,9,9,9\n-3,0,9,9,9,9,9,9\n2,0,1,1,1,1,1,1\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert_eq!(dataset.frame_count(), 2);
        assert_eq!(dataset.marker("LFHD").unwrap().len(), 1);
        assert_eq!(dataset.position_at_frame("LFHD", 2), Some(Position::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn bad_triple_only_drops_that_marker() {
        let text = format!("{HEADER}5,0,1.5,,3.5,4,5,6\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert_eq!(dataset.position_at_frame("LFHD", 5), None);
        assert!(dataset.marker("LFHD").is_none());
        assert_eq!(dataset.position_at_frame("RFHD", 5), Some(Position::new(4.0, 6.0, 5.0)));
        assert_eq!(dataset.frame_count(), 5);
    }

    #[test]
    fn short_rows_drop_trailing_markers() {
        let text = format!("{HEADER}3,0,1,2,3\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert!(dataset.position_at_frame("LFHD", 3).is_some());
        assert!(dataset.position_at_frame("RFHD", 3).is_none());
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let text = format!("{HEADER}1,0,NaN,2,3,inf,5,6\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert_eq!(dataset.marker_count(), 0);
        assert_eq!(dataset.frame_count(), 1);
    }

    #[test]
    fn frame_count_is_max_frame_not_row_count() {
        let text = format!("{HEADER}7,0,1,1,1,1,1,1\n2,0,1,1,1,1,1,1\n4,0,1,1,1,1,1,1\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert_eq!(dataset.frame_count(), 7);
        let frames: Vec<Frame> = dataset.marker("LFHD").unwrap().iter().map(|(f, _)| f).collect();
        assert_eq!(frames, vec![2, 4, 7]);
    }

    #[test]
    fn missing_title_line_is_a_format_error() {
        let err = load_dataset_from_string("header\nx\nmore\n").unwrap_err();
        match err {
            LoadError::Format { reason, .. } => assert_eq!(reason, FormatReason::NoDataSection),
            other => panic!("unexpected error {other:?}"),
        }

        let err = load_dataset_from_string("x\ny\nunits\n").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format { line: 3, reason: FormatReason::NoDataSection }
        ));
    }

    #[test]
    fn title_without_namespace_is_rejected_with_line_number() {
        let err = load_dataset_from_string("x\ny\nunits\nLFHD,Label:RFHD\n").unwrap_err();
        match err {
            LoadError::Format { line, reason } => {
                assert_eq!(line, 4);
                assert_eq!(reason, FormatReason::MalformedTitle("LFHD".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn later_row_wins_for_duplicate_frames() {
        let text = format!("{HEADER}1,0,1,1,1,1,1,1\n1,0,2,2,2,2,2,2\n");
        let dataset = load_dataset_from_string(&text).unwrap();
        assert_eq!(dataset.position_at_frame("LFHD", 1), Some(Position::new(2.0, 2.0, 2.0)));
    }
}
