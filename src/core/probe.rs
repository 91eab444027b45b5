//! Frame existence probes.
//!
//! A probe answers one question: does this frame URL resolve to an image,
//! and how big is it? "Not found" and "failed to decode" are the same
//! answer (`Missing`); discovery only cares whether it can show the frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace};

use crate::config::{AssetKind, DiscoveryConfig};

/// Result of probing one candidate frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found { width: u32, height: u32 },
    Missing,
}

impl ProbeOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Found { .. })
    }
}

/// Checks whether a frame URL exists
pub trait FrameProbe: Send + Sync {
    fn probe(&self, url: &str) -> ProbeOutcome;
}

/// A probe the player wants answered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeRequest {
    pub kind: AssetKind,
    pub index: u32,
    pub url: String,
}

/// Answer to a `ProbeRequest`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResponse {
    pub request: ProbeRequest,
    pub outcome: ProbeOutcome,
}

impl ProbeRequest {
    /// Run the request through a probe
    pub fn resolve(self, probe: &dyn FrameProbe) -> ProbeResponse {
        let outcome = probe.probe(&self.url);
        trace!("Probe {} -> {:?}", self.url, outcome);
        ProbeResponse {
            request: self,
            outcome,
        }
    }
}

/// Filesystem probe. Relative URLs resolve against `root`.
///
/// Only the image header is read (`image::image_dimensions`), so probing
/// a long sequence stays cheap.
#[derive(Clone, Debug)]
pub struct FsProbe {
    root: PathBuf,
}

impl FsProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl FrameProbe for FsProbe {
    fn probe(&self, url: &str) -> ProbeOutcome {
        let path = self.resolve(url);
        match image::image_dimensions(&path) {
            Ok((width, height)) => ProbeOutcome::Found { width, height },
            Err(e) => {
                debug!("Probe failed for {}: {}", path.display(), e);
                ProbeOutcome::Missing
            }
        }
    }
}

/// In-memory probe over a table of known frames. Counts every probe.
#[derive(Clone, Debug, Default)]
pub struct MapProbe {
    frames: Arc<Mutex<HashMap<String, (u32, u32)>>>,
    probes: Arc<AtomicUsize>,
}

impl MapProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, width: u32, height: u32) {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.into(), (width, height));
    }

    /// Register frames `indices` of a sequence, all `width` x `height`
    pub fn with_frames(
        self,
        discovery: &DiscoveryConfig,
        indices: impl IntoIterator<Item = u32>,
        width: u32,
        height: u32,
    ) -> Self {
        for index in indices {
            self.insert(discovery.frame_url(index), width, height);
        }
        self
    }

    /// Number of `probe` calls so far
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl FrameProbe for MapProbe {
    fn probe(&self, url: &str) -> ProbeOutcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.frames.lock().unwrap_or_else(|e| e.into_inner()).get(url) {
            Some(&(width, height)) => ProbeOutcome::Found { width, height },
            None => ProbeOutcome::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SequenceConfig;

    #[test]
    fn test_map_probe_counts_and_resolves() {
        let discovery = SequenceConfig::with_prefix("seq/frame_").discovery();
        let probe = MapProbe::new().with_frames(&discovery, 0..2, 64, 32);

        assert_eq!(
            probe.probe("seq/frame_000.png"),
            ProbeOutcome::Found { width: 64, height: 32 }
        );
        assert_eq!(probe.probe("seq/frame_002.png"), ProbeOutcome::Missing);
        assert_eq!(probe.probe_count(), 2);
    }

    #[test]
    fn test_request_resolve_keeps_request() {
        let probe = MapProbe::new();
        probe.insert("a.png", 1, 1);
        let request = ProbeRequest {
            kind: AssetKind::Png,
            index: 3,
            url: "a.png".into(),
        };
        let response = request.clone().resolve(&probe);
        assert_eq!(response.request, request);
        assert!(response.outcome.is_found());
    }

    #[test]
    fn test_fs_probe_missing_file() {
        let probe = FsProbe::new(std::env::temp_dir());
        assert_eq!(
            probe.probe("flipbook-definitely-not-here/frame_000.png"),
            ProbeOutcome::Missing
        );
    }
}
