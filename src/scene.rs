//! Scene-framework seam: display surfaces and the host that creates them.
//!
//! The crate never renders. It drives a `DisplaySurface` (an image plane in
//! the host scene graph) by setting visibility, size, material and the
//! current frame source. `HeadlessSurface`/`HeadlessHost` record those calls
//! for tools and tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use log::trace;

use crate::config::AssetKind;

/// Size of a display surface in scene units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// Material applied to a sized surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub transparent: bool,
    pub alpha_test: f32,
    pub double_sided: bool,
}

impl Default for Material {
    /// Cut-out PNG frames visible from both sides
    fn default() -> Self {
        Self {
            transparent: true,
            alpha_test: 0.01,
            double_sided: true,
        }
    }
}

/// Image plane in the host scene
pub trait DisplaySurface {
    fn set_visible(&mut self, visible: bool);
    /// Set the texture/image source to a frame URL
    fn set_source(&mut self, url: &str);
    fn set_size(&mut self, size: SurfaceSize);
    fn set_material(&mut self, material: Material);
    /// Hint that these frames will be shown soon. Must not block.
    fn preload(&mut self, _frames: &[String]) {}
}

/// Creates display surfaces in the scene graph
pub trait SceneHost {
    /// `None` when the scene cannot provide a surface for this kind
    fn create_surface(&mut self, target: &str, kind: AssetKind) -> Option<Box<dyn DisplaySurface>>;
}

/// Everything a `HeadlessSurface` has been told
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceState {
    pub visible: bool,
    pub source: Option<String>,
    pub size: Option<SurfaceSize>,
    pub material: Option<Material>,
    /// Every source ever set, in order
    pub sources: Vec<String>,
    pub preloaded: usize,
}

/// Recording surface. Clones share state, so a handle stays readable after
/// the surface itself was handed to a player.
#[derive(Clone, Debug, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SurfaceState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn with_state(&self, f: impl FnOnce(&mut SurfaceState)) {
        f(&mut self.state.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

impl DisplaySurface for HeadlessSurface {
    fn set_visible(&mut self, visible: bool) {
        self.with_state(|s| s.visible = visible);
    }

    fn set_source(&mut self, url: &str) {
        trace!("HeadlessSurface: source -> {}", url);
        self.with_state(|s| {
            s.source = Some(url.to_string());
            s.sources.push(url.to_string());
        });
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.with_state(|s| s.size = Some(size));
    }

    fn set_material(&mut self, material: Material) {
        self.with_state(|s| s.material = Some(material));
    }

    fn preload(&mut self, frames: &[String]) {
        self.with_state(|s| s.preloaded = frames.len());
    }
}

#[derive(Debug, Default)]
struct HostState {
    surfaces: IndexMap<(String, AssetKind), HeadlessSurface>,
    refused: HashSet<AssetKind>,
}

/// Host that hands out `HeadlessSurface`s and keeps a handle to each.
/// Clones share the registry.
#[derive(Clone, Debug, Default)]
pub struct HeadlessHost {
    inner: Arc<Mutex<HostState>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_surface` fail for this kind (simulates a broken scene)
    pub fn refuse(&self, kind: AssetKind) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).refused.insert(kind);
    }

    /// Surface created for (target, kind), if any
    pub fn surface(&self, target: &str, kind: AssetKind) -> Option<HeadlessSurface> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .surfaces
            .get(&(target.to_string(), kind))
            .cloned()
    }

    pub fn surface_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).surfaces.len()
    }
}

impl SceneHost for HeadlessHost {
    fn create_surface(&mut self, target: &str, kind: AssetKind) -> Option<Box<dyn DisplaySurface>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.refused.contains(&kind) {
            return None;
        }
        let surface = HeadlessSurface::new();
        inner.surfaces.insert((target.to_string(), kind), surface.clone());
        Some(Box::new(surface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_surface_records_calls() {
        let handle = HeadlessSurface::new();
        let mut surface: Box<dyn DisplaySurface> = Box::new(handle.clone());

        surface.set_size(SurfaceSize { width: 1.0, height: 0.5 });
        surface.set_material(Material::default());
        surface.set_source("a_000.png");
        surface.set_source("a_001.png");
        surface.set_visible(true);

        let state = handle.state();
        assert!(state.visible);
        assert_eq!(state.source.as_deref(), Some("a_001.png"));
        assert_eq!(state.sources.len(), 2);
        assert_eq!(state.size, Some(SurfaceSize { width: 1.0, height: 0.5 }));
        assert_eq!(state.material.map(|m| m.alpha_test), Some(0.01));
    }

    #[test]
    fn test_headless_host_registry_and_refusal() {
        let host = HeadlessHost::new();
        let mut creator = host.clone();

        assert!(creator.create_surface("poster", AssetKind::Png).is_some());
        host.refuse(AssetKind::Webp);
        assert!(creator.create_surface("poster", AssetKind::Webp).is_none());

        assert_eq!(host.surface_count(), 1);
        assert!(host.surface("poster", AssetKind::Png).is_some());
        assert!(host.surface("poster", AssetKind::Webp).is_none());
    }
}
