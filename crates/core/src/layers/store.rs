//! Named layer store owned by one spatial domain.

use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use crate::layers::raster::RasterLayer;
use rustc_hash::FxHashMap;
use tracing::info;

/// Exclusive owner of all raster layers registered into one domain.
///
/// Registration replaces any existing layer of the same name wholesale; read
/// operations never mutate layer data.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: FxHashMap<String, RasterLayer>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a validated layer, retiring any previous layer of the same name.
    pub fn register(&mut self, layer: RasterLayer) {
        let name = layer.name().to_owned();
        if self.layers.insert(name.clone(), layer).is_some() {
            info!(name = %name, "layer re-registered, previous data retired");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&RasterLayer> {
        self.layers
            .get(name)
            .ok_or_else(|| FireError::UnknownLayer(name.to_owned()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut RasterLayer> {
        self.layers
            .get_mut(name)
            .ok_or_else(|| FireError::UnknownLayer(name.to_owned()))
    }

    /// Nearest-cell sample of a named layer. See [`RasterLayer::sample`].
    pub fn sample(&self, name: &str, point: Vec2, time: f64, strict: bool) -> Result<f64> {
        self.get(name)?.sample(point, time, strict)
    }

    /// Full canonical-order grid of a named layer at `time`.
    pub fn export_grid(&self, name: &str, time: f64, strict: bool) -> Result<(Vec<f64>, [usize; 3])> {
        self.get(name)?.export_slice(time, strict)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Registered layer names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::raster::{GridOrder, LayerShape};
    use approx::assert_relative_eq;

    fn unit_shape() -> LayerShape {
        LayerShape {
            origin: Vec2::new(0.0, 0.0),
            extent: Vec2::new(1.0, 1.0),
            time_origin: 0.0,
            time_span: 0.0,
            nx: 1,
            ny: 1,
            nz: 1,
            nt: 1,
        }
    }

    #[test]
    fn test_unknown_layer() {
        let store = LayerStore::new();
        assert_eq!(
            store.sample("windU", Vec2::new(0.0, 0.0), 0.0, false),
            Err(FireError::UnknownLayer("windU".into()))
        );
    }

    #[test]
    fn test_reregistration_replaces_wholesale() {
        let mut store = LayerStore::new();
        store.register(
            RasterLayer::scalar("windU", unit_shape(), GridOrder::XFastest, vec![3.0]).unwrap(),
        );
        store.register(
            RasterLayer::scalar("windU", unit_shape(), GridOrder::XFastest, vec![8.0]).unwrap(),
        );

        assert_eq!(store.len(), 1);
        let v = store
            .sample("windU", Vec2::new(0.5, 0.5), 0.0, false)
            .unwrap();
        assert_relative_eq!(v, 8.0);
    }
}
