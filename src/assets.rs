//! Asset resolution for painters.
//!
//! Resolution never fails: an unknown key yields a shared error placeholder
//! (magenta/black checkerboard) that draws like any other image. Decoding
//! and fetching happen elsewhere; the store only hands out rasters that were
//! registered with it.

#[cfg(test)]
#[path = "assets_test.rs"]
mod assets_test;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::geom::Point;
use crate::surface::{Color, Raster, RectDraw};

/// Side length of the error placeholder, in pixels.
pub const PLACEHOLDER_SIZE: u32 = 16;

/// Suffix of the low-quality variant of an asset key.
const LQ_SUFFIX: &str = ".lq";

/// Hands out drawable images by key.
#[async_trait::async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolve `key`, preferring the low-quality variant when `hq` is false.
    /// Returns a placeholder instead of failing.
    async fn resolve(&self, key: &str, hq: bool) -> Arc<Raster>;
}

/// In-memory asset registry.
pub struct AssetStore {
    assets: HashMap<String, Arc<Raster>>,
    placeholder: Arc<Raster>,
}

impl AssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self { assets: HashMap::new(), placeholder: Arc::new(placeholder()) }
    }

    /// Register (or replace) an asset under `key`.
    pub fn register(&mut self, key: impl Into<String>, raster: Raster) {
        self.assets.insert(key.into(), Arc::new(raster));
    }

    /// Register a low-quality variant of `key`.
    pub fn register_lq(&mut self, key: &str, raster: Raster) {
        self.assets.insert(format!("{key}{LQ_SUFFIX}"), Arc::new(raster));
    }

    /// The shared error placeholder.
    #[must_use]
    pub fn placeholder(&self) -> Arc<Raster> {
        Arc::clone(&self.placeholder)
    }

    /// Synchronous lookup used by [`AssetResolver::resolve`].
    #[must_use]
    pub fn lookup(&self, key: &str, hq: bool) -> Arc<Raster> {
        if !hq {
            if let Some(lq) = self.assets.get(&format!("{key}{LQ_SUFFIX}")) {
                return Arc::clone(lq);
            }
        }
        if let Some(asset) = self.assets.get(key) {
            return Arc::clone(asset);
        }
        debug!(key, hq, "asset missing; using placeholder");
        self.placeholder()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AssetResolver for AssetStore {
    async fn resolve(&self, key: &str, hq: bool) -> Arc<Raster> {
        self.lookup(key, hq)
    }
}

fn placeholder() -> Raster {
    let mut raster = match Raster::filled(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, Color::BLACK) {
        Ok(raster) => raster,
        Err(err) => {
            warn!(error = %err, "placeholder allocation failed; using an empty image");
            return Raster::empty();
        }
    };
    let half = f64::from(PLACEHOLDER_SIZE / 2);
    for origin in [Point::new(0.0, 0.0), Point::new(half, half)] {
        raster.fill_rect(&RectDraw::filled(origin.x, origin.y, half, half, Color::MAGENTA));
    }
    raster
}
