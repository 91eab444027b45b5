//! Frame discovery - find how many frames a sequence has.
//!
//! The frame count is not known up front, so candidates are probed one by
//! one in index order:
//!
//! - found: append, go to the next index
//! - missing, nothing found yet: skip it (leading gaps are tolerated)
//! - missing after at least one frame: stop (the run is contiguous)
//!
//! `max_index` bounds the walk. The discoverer does no I/O itself: it hands
//! out the next URL to probe and consumes the answer, so the caller decides
//! whether probing is inline or on a worker thread. Exactly one probe is
//! outstanding at any time.

use log::{debug, trace};

use crate::config::DiscoveryConfig;

use super::probe::{FrameProbe, ProbeOutcome};

/// Ordered, immutable list of frame URLs. Order is playback order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<String>,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.frames.get(index).map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.frames
    }
}

/// Outcome of a finished discovery run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoveryResult {
    pub frames: FrameSet,
    /// height / width of the first frame, `None` when no frame was found
    pub aspect_ratio: Option<f64>,
}

/// What the caller should do next
#[derive(Clone, Debug, PartialEq)]
pub enum DiscoveryStep {
    /// Probe this candidate and report back via `on_probe`
    Probe { index: u32, url: String },
    /// Discovery finished
    Complete(DiscoveryResult),
    /// Answer did not match the outstanding probe; nothing changed
    Stale,
}

/// Sequential probe state machine
#[derive(Clone, Debug)]
pub struct FrameDiscoverer {
    config: DiscoveryConfig,
    next_index: u32,
    outstanding: Option<u32>,
    frames: Vec<String>,
    aspect_ratio: Option<f64>,
    finished: bool,
}

impl FrameDiscoverer {
    pub fn new(config: DiscoveryConfig) -> Self {
        let next_index = config.start_index;
        Self {
            config,
            next_index,
            outstanding: None,
            frames: Vec::new(),
            aspect_ratio: None,
            finished: false,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Frames found so far
    pub fn found(&self) -> usize {
        self.frames.len()
    }

    /// First step. Calling it again while a probe is outstanding re-issues
    /// that probe.
    pub fn begin(&mut self) -> DiscoveryStep {
        if let Some(index) = self.outstanding {
            return DiscoveryStep::Probe {
                index,
                url: self.config.frame_url(index),
            };
        }
        self.next_step()
    }

    /// Feed the answer for probe `index` and get the next step
    pub fn on_probe(&mut self, index: u32, outcome: ProbeOutcome) -> DiscoveryStep {
        if self.finished || self.outstanding != Some(index) {
            trace!(
                "Discovery {}: ignoring answer for index {} (outstanding {:?})",
                self.config.prefix, index, self.outstanding
            );
            return DiscoveryStep::Stale;
        }
        self.outstanding = None;

        match outcome {
            ProbeOutcome::Found { width, height } => {
                if self.frames.is_empty() {
                    // Zero dimensions count as 1 so the ratio stays finite
                    let w = width.max(1) as f64;
                    let h = height.max(1) as f64;
                    self.aspect_ratio = Some(h / w);
                }
                self.frames.push(self.config.frame_url(index));
                self.next_index = index.saturating_add(1);
                self.next_step()
            }
            ProbeOutcome::Missing if !self.frames.is_empty() => {
                trace!("Discovery {}: run ends before index {}", self.config.prefix, index);
                self.complete()
            }
            ProbeOutcome::Missing => {
                self.next_index = index.saturating_add(1);
                self.next_step()
            }
        }
    }

    fn next_step(&mut self) -> DiscoveryStep {
        if self.finished {
            return DiscoveryStep::Stale;
        }
        if self.next_index >= self.config.max_index {
            return self.complete();
        }
        let index = self.next_index;
        self.outstanding = Some(index);
        DiscoveryStep::Probe {
            index,
            url: self.config.frame_url(index),
        }
    }

    fn complete(&mut self) -> DiscoveryStep {
        self.finished = true;
        self.outstanding = None;
        let frames = FrameSet {
            frames: std::mem::take(&mut self.frames),
        };
        debug!(
            "Discovery {}: {} frame(s) in [{}, {})",
            self.config.prefix,
            frames.len(),
            self.config.start_index,
            self.config.max_index
        );
        DiscoveryStep::Complete(DiscoveryResult {
            frames,
            aspect_ratio: self.aspect_ratio,
        })
    }
}

/// Run a whole discovery inline against a blocking probe
pub fn discover(config: DiscoveryConfig, probe: &dyn FrameProbe) -> DiscoveryResult {
    let mut discoverer = FrameDiscoverer::new(config);
    let mut step = discoverer.begin();
    loop {
        match step {
            DiscoveryStep::Probe { index, url } => {
                let outcome = probe.probe(&url);
                step = discoverer.on_probe(index, outcome);
            }
            DiscoveryStep::Complete(result) => return result,
            // Only reachable by feeding a foreign answer, which this loop never does
            DiscoveryStep::Stale => return DiscoveryResult::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SequenceConfig;
    use crate::core::probe::MapProbe;

    fn discovery(prefix: &str, start: u32, max: u32) -> DiscoveryConfig {
        let mut config = SequenceConfig::with_prefix(prefix);
        config.start_index = start;
        config.max_index = max;
        config.discovery()
    }

    #[test]
    fn test_contiguous_run_stops_at_gap() {
        let config = discovery("seq/frame_", 0, 300);
        // 0..5 exist, 6..8 exist after a gap: never reached
        let probe = MapProbe::new()
            .with_frames(&config, 0..5, 200, 100)
            .with_frames(&config, 6..8, 200, 100);

        let result = discover(config, &probe);
        assert_eq!(result.frames.len(), 5);
        assert_eq!(result.frames.first(), Some("seq/frame_000.png"));
        assert_eq!(result.frames.get(4), Some("seq/frame_004.png"));
        assert_eq!(result.aspect_ratio, Some(0.5));
        // 5 hits + the terminating miss
        assert_eq!(probe.probe_count(), 6);
    }

    #[test]
    fn test_leading_gap_is_skipped() {
        let config = discovery("f_", 0, 50);
        let probe = MapProbe::new().with_frames(&config, 3..6, 10, 10);

        let result = discover(config, &probe);
        let urls: Vec<&str> = result.frames.iter().collect();
        assert_eq!(urls, vec!["f_003.png", "f_004.png", "f_005.png"]);
    }

    #[test]
    fn test_empty_range_probes_every_index_once() {
        let config = discovery("none_", 5, 15);
        let probe = MapProbe::new();

        let result = discover(config, &probe);
        assert!(result.frames.is_empty());
        assert_eq!(result.aspect_ratio, None);
        assert_eq!(probe.probe_count(), 10);
    }

    #[test]
    fn test_run_reaching_max_index() {
        let config = discovery("all_", 0, 4);
        let probe = MapProbe::new().with_frames(&config, 0..10, 10, 30);

        let result = discover(config, &probe);
        assert_eq!(result.frames.len(), 4);
        assert_eq!(result.aspect_ratio, Some(3.0));
        assert_eq!(probe.probe_count(), 4);
    }

    #[test]
    fn test_aspect_from_first_frame_only() {
        let config = discovery("mix_", 0, 10);
        let probe = MapProbe::new();
        probe.insert(config.frame_url(0), 100, 50);
        probe.insert(config.frame_url(1), 100, 400);

        let result = discover(config, &probe);
        assert_eq!(result.aspect_ratio, Some(0.5));
    }

    #[test]
    fn test_zero_sized_first_frame() {
        let config = discovery("z_", 0, 10);
        let probe = MapProbe::new();
        probe.insert(config.frame_url(0), 0, 0);

        let result = discover(config, &probe);
        assert_eq!(result.aspect_ratio, Some(1.0));
    }

    #[test]
    fn test_stepwise_single_outstanding_probe() {
        let config = discovery("s_", 0, 10);
        let mut discoverer = FrameDiscoverer::new(config);

        let DiscoveryStep::Probe { index, .. } = discoverer.begin() else {
            panic!("expected a probe");
        };
        assert_eq!(index, 0);
        // Re-beginning re-issues the same probe
        assert!(matches!(discoverer.begin(), DiscoveryStep::Probe { index: 0, .. }));
        // Answer for an index nobody asked about
        assert_eq!(discoverer.on_probe(7, ProbeOutcome::Missing), DiscoveryStep::Stale);

        let step = discoverer.on_probe(0, ProbeOutcome::Found { width: 4, height: 4 });
        assert!(matches!(step, DiscoveryStep::Probe { index: 1, .. }));
        assert_eq!(discoverer.found(), 1);

        let step = discoverer.on_probe(1, ProbeOutcome::Missing);
        let DiscoveryStep::Complete(result) = step else {
            panic!("expected completion");
        };
        assert_eq!(result.frames.len(), 1);
        assert!(discoverer.is_finished());
        assert_eq!(discoverer.on_probe(2, ProbeOutcome::Missing), DiscoveryStep::Stale);
    }
}
