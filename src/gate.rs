use crate::alignment::AlignmentSample;
use crate::config::{AlignmentSettings, DEFAULT_THRESHOLD, DEFAULT_TOLERANCE};
use tracing::debug;

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    Pause,
    Resume,
}

/// Process-lifetime gate state. Survives dataset reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub enabled: bool,
    /// Similarity floor; groups strictly below it count as out of alignment.
    pub threshold: f64,
    /// How many groups may be out of alignment before playback pauses.
    pub tolerance: usize,
    pub last_verdict: Option<GateSignal>,
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState {
            enabled: false,
            threshold: DEFAULT_THRESHOLD,
            tolerance: DEFAULT_TOLERANCE,
            last_verdict: None,
        }
    }
}

/// Pauses recorded playback while too many body parts disagree with it.
#[derive(Debug, Clone, Default)]
pub struct PlaybackGate {
    state: SyncState,
}

impl PlaybackGate {
    pub fn new(settings: &AlignmentSettings) -> Self {
        let mut gate = PlaybackGate::default();
        gate.configure(settings);
        gate
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.state.enabled = enabled;
    }

    /// Takes threshold and tolerance from `settings` and forgets the last verdict.
    pub fn configure(&mut self, settings: &AlignmentSettings) {
        self.state.threshold = settings.threshold();
        self.state.tolerance = settings.tolerance();
        self.state.last_verdict = None;
    }

    /// Complete groups whose similarity is below the threshold. Incomplete groups never count.
    pub fn count_below_threshold(&self, samples: &[AlignmentSample]) -> usize {
        samples
            .iter()
            .filter_map(AlignmentSample::alignment)
            .filter(|alignment| alignment.similarity < self.state.threshold)
            .count()
    }

    /// `samples` is `None` while either rig has no binding yet; the gate then defers.
    /// A disabled gate never signals.
    pub fn evaluate(&mut self, samples: Option<&[AlignmentSample]>) -> Option<GateSignal> {
        if !self.state.enabled {
            return None;
        }
        let samples = samples?;

        let below = self.count_below_threshold(samples);
        let signal = if below > self.state.tolerance {
            GateSignal::Pause
        } else {
            GateSignal::Resume
        };

        if self.state.last_verdict != Some(signal) {
            debug!(?signal, below, tolerance = self.state.tolerance, "playback gate verdict changed");
        }
        self.state.last_verdict = Some(signal);
        Some(signal)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{GroupAlignment, IncompleteReason, SampleOutcome};
    use crate::types::Position;

    fn complete(similarity: f64) -> AlignmentSample {
        AlignmentSample {
            group: format!("g{similarity}"),
            outcome: SampleOutcome::Complete(GroupAlignment {
                control_mean: Position::new(0.0, 1.0, 0.0),
                user_mean: Position::new(0.0, 1.0, 0.0),
                similarity,
                score: similarity.max(0.0),
                connections_used: 1,
            }),
        }
    }

    fn incomplete() -> AlignmentSample {
        AlignmentSample {
            group: "gone".to_string(),
            outcome: SampleOutcome::Incomplete(IncompleteReason::NoConnections),
        }
    }

    fn gate(threshold: f64, tolerance: usize) -> PlaybackGate {
        let mut settings = AlignmentSettings::default();
        settings.set_threshold(threshold).unwrap();
        settings.set_tolerance(tolerance);
        let mut gate = PlaybackGate::new(&settings);
        gate.set_enabled(true);
        gate
    }

    #[test]
    fn pauses_only_when_count_exceeds_tolerance() {
        let mut gate = gate(0.9, 2);

        let three_below = [complete(0.1), complete(0.2), complete(-0.5), complete(1.0)];
        assert_eq!(gate.evaluate(Some(&three_below[..])), Some(GateSignal::Pause));

        let two_below = [complete(0.1), complete(0.2), complete(0.95), complete(1.0)];
        assert_eq!(gate.evaluate(Some(&two_below[..])), Some(GateSignal::Resume));
        assert_eq!(gate.state().last_verdict, Some(GateSignal::Resume));
    }

    #[test]
    fn aligned_groups_never_pause_even_with_zero_tolerance() {
        let mut gate = gate(1.0, 0);
        let samples = [complete(1.0), complete(1.0), complete(1.0)];
        assert_eq!(gate.evaluate(Some(&samples[..])), Some(GateSignal::Resume));
    }

    #[test]
    fn incomplete_groups_are_not_failures() {
        let mut gate = gate(0.9, 0);
        let samples = [incomplete(), incomplete(), complete(0.99)];
        assert_eq!(gate.count_below_threshold(&samples), 0);
        assert_eq!(gate.evaluate(Some(&samples[..])), Some(GateSignal::Resume));
    }

    #[test]
    fn disabled_gate_is_inert() {
        let mut gate = gate(0.9, 0);
        gate.set_enabled(false);
        assert_eq!(gate.evaluate(Some(&[complete(-1.0)][..])), None);
        assert_eq!(gate.state().last_verdict, None);
    }

    #[test]
    fn unready_rigs_defer_without_side_effects() {
        let mut gate = gate(0.9, 0);
        assert_eq!(gate.evaluate(Some(&[complete(-1.0)][..])), Some(GateSignal::Pause));
        assert_eq!(gate.evaluate(None), None);
        assert_eq!(gate.state().last_verdict, Some(GateSignal::Pause));
    }

    #[test]
    fn reconfiguring_resets_the_verdict() {
        let mut gate = gate(0.9, 0);
        gate.evaluate(Some(&[complete(-1.0)][..]));
        gate.configure(&AlignmentSettings::default());
        assert_eq!(gate.state().last_verdict, None);
        assert!(gate.is_enabled());
        assert_eq!(gate.state().tolerance, DEFAULT_TOLERANCE);
    }
}
