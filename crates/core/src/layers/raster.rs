//! Raster layer storage, normalization, and point sampling.
//!
//! Canonical storage order is x-fastest: `((t * nz + z) * ny + y) * nx + x`.
//! Sources authored y-fastest declare [`GridOrder::YFastest`] and are
//! transposed once at construction. Spatial lookup is nearest-cell; temporal
//! lookup selects the slice whose window contains the query time and clamps
//! beyond the declared span unless strict range checking is requested.

use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use serde::{Deserialize, Serialize};

/// Closed set of layer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    /// Continuous-valued environmental field
    Scalar,
    /// Integer-coded field (fuel type)
    Index,
    /// Derived field written by the simulation
    Flux,
}

/// Axis order of a source buffer at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridOrder {
    /// x varies fastest: `((t*nz + z)*ny + y)*nx + x`. Canonical.
    #[default]
    XFastest,
    /// y varies fastest: `((t*nz + z)*nx + x)*ny + y`. Transposed on ingestion.
    YFastest,
}

/// Spatial and temporal shape of one raster layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerShape {
    /// South-west corner of the layer footprint (m)
    pub origin: Vec2,
    /// Footprint width and height (m)
    pub extent: Vec2,
    /// Start of the layer's time axis (s, reference-relative)
    pub time_origin: f64,
    /// Length of the time axis (s); 0 for static layers
    pub time_span: f64,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Number of time slices; 1 for static layers
    pub nt: usize,
}

impl LayerShape {
    /// Total element count the backing buffer must match.
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz * self.nt
    }

    /// Element count of one time slice.
    pub fn slice_len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Nearest grid cell containing `point`, clamped to the footprint.
    pub fn cell_at(&self, point: Vec2) -> (usize, usize) {
        let fx = (point.x - self.origin.x) / self.extent.x;
        let fy = (point.y - self.origin.y) / self.extent.y;
        let ix = ((fx * self.nx as f64).floor() as isize).clamp(0, self.nx as isize - 1);
        let iy = ((fy * self.ny as f64).floor() as isize).clamp(0, self.ny as isize - 1);
        (ix as usize, iy as usize)
    }

    /// Canonical flat index for a cell in a given slice.
    pub fn index(&self, ix: usize, iy: usize, iz: usize, it: usize) -> usize {
        ((it * self.nz + iz) * self.ny + iy) * self.nx + ix
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LayerData {
    Scalar(Vec<f64>),
    Index(Vec<i32>),
    Flux(Vec<f64>),
}

/// One named, typed raster dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    name: String,
    shape: LayerShape,
    data: LayerData,
}

impl RasterLayer {
    /// Create a scalar layer, validating and normalizing the buffer.
    pub fn scalar(
        name: impl Into<String>,
        shape: LayerShape,
        order: GridOrder,
        data: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        validate_len(&name, &shape, data.len())?;
        Ok(Self {
            name,
            data: LayerData::Scalar(normalize_f64(&shape, order, data)),
            shape,
        })
    }

    /// Create an index layer, validating and normalizing the buffer.
    pub fn index(
        name: impl Into<String>,
        shape: LayerShape,
        order: GridOrder,
        data: Vec<i32>,
    ) -> Result<Self> {
        let name = name.into();
        validate_len(&name, &shape, data.len())?;
        let normalized = match order {
            GridOrder::XFastest => data,
            GridOrder::YFastest => transpose(&shape, &data),
        };
        Ok(Self {
            name,
            data: LayerData::Index(normalized),
            shape,
        })
    }

    /// Create a flux layer filled with a sentinel value.
    ///
    /// Flux layers are authored by the simulation, so there is no source
    /// buffer to normalize.
    pub fn flux(name: impl Into<String>, shape: LayerShape, fill: f64) -> Result<Self> {
        let name = name.into();
        validate_shape(&name, &shape)?;
        let len = shape.cell_count();
        Ok(Self {
            name,
            shape,
            data: LayerData::Flux(vec![fill; len]),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &LayerShape {
        &self.shape
    }

    pub fn kind(&self) -> LayerKind {
        match self.data {
            LayerData::Scalar(_) => LayerKind::Scalar,
            LayerData::Index(_) => LayerKind::Index,
            LayerData::Flux(_) => LayerKind::Flux,
        }
    }

    /// Time slice containing `time`.
    ///
    /// Beyond the declared span the last (or first) slice is used, unless
    /// `strict` is set, in which case the query fails.
    pub fn time_slice(&self, time: f64, strict: bool) -> Result<usize> {
        let t0 = self.shape.time_origin;
        let t1 = t0 + self.shape.time_span;
        if self.shape.nt <= 1 {
            return Ok(0);
        }
        if strict && !(t0..=t1).contains(&time) {
            return Err(FireError::InvalidTimeRange {
                name: self.name.clone(),
                time,
                t0,
                t1,
            });
        }
        let slice_span = self.shape.time_span / self.shape.nt as f64;
        let it = ((time - t0) / slice_span).floor() as isize;
        Ok(it.clamp(0, self.shape.nt as isize - 1) as usize)
    }

    /// Nearest-cell sample at ground level (z = 0).
    ///
    /// Index layers yield their code as `f64`.
    pub fn sample(&self, point: Vec2, time: f64, strict: bool) -> Result<f64> {
        let it = self.time_slice(time, strict)?;
        let (ix, iy) = self.shape.cell_at(point);
        let idx = self.shape.index(ix, iy, 0, it);
        Ok(match &self.data {
            LayerData::Scalar(v) | LayerData::Flux(v) => v[idx],
            LayerData::Index(v) => f64::from(v[idx]),
        })
    }

    /// Value at an explicit cell address.
    pub fn value_at(&self, ix: usize, iy: usize, iz: usize, it: usize) -> f64 {
        let idx = self.shape.index(ix, iy, iz, it);
        match &self.data {
            LayerData::Scalar(v) | LayerData::Flux(v) => v[idx],
            LayerData::Index(v) => f64::from(v[idx]),
        }
    }

    /// Copy out the full canonical-order slice containing `time`.
    ///
    /// Returns the buffer together with its `(nx, ny, nz)` dimensions so the
    /// caller never has to reconstruct the axis convention.
    pub fn export_slice(&self, time: f64, strict: bool) -> Result<(Vec<f64>, [usize; 3])> {
        let it = self.time_slice(time, strict)?;
        let len = self.shape.slice_len();
        let start = it * len;
        let out = match &self.data {
            LayerData::Scalar(v) | LayerData::Flux(v) => v[start..start + len].to_vec(),
            LayerData::Index(v) => v[start..start + len].iter().map(|&c| f64::from(c)).collect(),
        };
        Ok((out, [self.shape.nx, self.shape.ny, self.shape.nz]))
    }

    /// Write a single cell of a flux layer. No-op on other kinds.
    ///
    /// Only the simulation's bookkeeping path uses this.
    pub fn write_cell(&mut self, ix: usize, iy: usize, it: usize, value: f64) {
        let idx = self.shape.index(ix, iy, 0, it);
        if let LayerData::Flux(v) = &mut self.data {
            v[idx] = value;
        }
    }
}

/// A zero-sized dimension would make every cell address degenerate, so it
/// is rejected up front rather than at first sample.
fn validate_shape(name: &str, shape: &LayerShape) -> Result<()> {
    if shape.nx == 0 || shape.ny == 0 || shape.nz == 0 || shape.nt == 0 {
        return Err(FireError::ZeroSizedLayer {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn validate_len(name: &str, shape: &LayerShape, actual: usize) -> Result<()> {
    validate_shape(name, shape)?;
    let declared = shape.cell_count();
    if declared != actual {
        return Err(FireError::DimensionMismatch {
            name: name.to_owned(),
            declared,
            actual,
        });
    }
    Ok(())
}

fn normalize_f64(shape: &LayerShape, order: GridOrder, data: Vec<f64>) -> Vec<f64> {
    match order {
        GridOrder::XFastest => data,
        GridOrder::YFastest => transpose(shape, &data),
    }
}

/// Reorder a y-fastest source buffer into canonical x-fastest storage.
fn transpose<T: Copy>(shape: &LayerShape, src: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(src.len());
    for it in 0..shape.nt {
        for iz in 0..shape.nz {
            let plane = (it * shape.nz + iz) * shape.nx * shape.ny;
            for iy in 0..shape.ny {
                for ix in 0..shape.nx {
                    out.push(src[plane + ix * shape.ny + iy]);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shape_2x3(nt: usize, time_span: f64) -> LayerShape {
        LayerShape {
            origin: Vec2::new(0.0, 0.0),
            extent: Vec2::new(2.0, 3.0),
            time_origin: 0.0,
            time_span,
            nx: 2,
            ny: 3,
            nz: 1,
            nt,
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let err = RasterLayer::scalar("wind", shape_2x3(1, 0.0), GridOrder::XFastest, vec![0.0; 5])
            .unwrap_err();
        assert_eq!(
            err,
            FireError::DimensionMismatch {
                name: "wind".into(),
                declared: 6,
                actual: 5,
            }
        );
    }

    #[test]
    fn test_zero_sized_dimension_rejected() {
        let mut shape = shape_2x3(1, 0.0);
        shape.nx = 0;
        shape.ny = 0;

        // An empty buffer matches the zero cell count, so the length check
        // alone would let this through and the first sample would address a
        // cell in an empty grid.
        let err = RasterLayer::scalar("empty", shape.clone(), GridOrder::XFastest, vec![])
            .unwrap_err();
        assert_eq!(err, FireError::ZeroSizedLayer { name: "empty".into() });

        assert!(matches!(
            RasterLayer::index("empty", shape.clone(), GridOrder::XFastest, vec![]),
            Err(FireError::ZeroSizedLayer { .. })
        ));
        assert!(matches!(
            RasterLayer::flux("empty", shape, -1.0),
            Err(FireError::ZeroSizedLayer { .. })
        ));
    }

    #[test]
    fn test_transpose_normalizes_on_ingestion() {
        // Logical grid values: value(x, y) = 10*x + y
        let x_fastest = vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0];
        let y_fastest = vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0];

        let a =
            RasterLayer::scalar("a", shape_2x3(1, 0.0), GridOrder::XFastest, x_fastest).unwrap();
        let b =
            RasterLayer::scalar("b", shape_2x3(1, 0.0), GridOrder::YFastest, y_fastest).unwrap();

        for iy in 0..3 {
            for ix in 0..2 {
                assert_relative_eq!(a.value_at(ix, iy, 0, 0), b.value_at(ix, iy, 0, 0));
            }
        }
    }

    #[test]
    fn test_nearest_cell_sample() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let layer = RasterLayer::scalar("f", shape_2x3(1, 0.0), GridOrder::XFastest, data).unwrap();

        // Cell (0,0) covers x in [0,1), y in [0,1)
        assert_relative_eq!(layer.sample(Vec2::new(0.5, 0.5), 0.0, false).unwrap(), 1.0);
        // Cell (1,2) covers x in [1,2), y in [2,3)
        assert_relative_eq!(layer.sample(Vec2::new(1.5, 2.5), 0.0, false).unwrap(), 6.0);
        // Out-of-footprint points clamp to the border cell
        assert_relative_eq!(
            layer.sample(Vec2::new(-5.0, -5.0), 0.0, false).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_time_slice_selection_and_clamp() {
        let data: Vec<f64> = (0..12).map(f64::from).collect();
        let layer = RasterLayer::scalar("w", shape_2x3(2, 100.0), GridOrder::XFastest, data)
            .unwrap();

        assert_eq!(layer.time_slice(10.0, false).unwrap(), 0);
        assert_eq!(layer.time_slice(60.0, false).unwrap(), 1);
        // Beyond the span: clamp to last slice
        assert_eq!(layer.time_slice(500.0, false).unwrap(), 1);
        // Strict mode fails instead
        assert!(matches!(
            layer.time_slice(500.0, true),
            Err(FireError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn test_static_layer_ignores_time() {
        let data = vec![7.0; 6];
        let layer = RasterLayer::scalar("s", shape_2x3(1, 0.0), GridOrder::XFastest, data).unwrap();
        assert_eq!(layer.time_slice(1.0e9, true).unwrap(), 0);
    }

    #[test]
    fn test_flux_write_cell() {
        let mut layer = RasterLayer::flux("arrival", shape_2x3(1, 0.0), -1.0).unwrap();
        layer.write_cell(1, 2, 0, 42.0);
        assert_relative_eq!(layer.value_at(1, 2, 0, 0), 42.0);
        assert_relative_eq!(layer.value_at(0, 0, 0, 0), -1.0);
    }

    #[test]
    fn test_index_layer_codes() {
        let layer = RasterLayer::index(
            "fuel",
            shape_2x3(1, 0.0),
            GridOrder::XFastest,
            vec![3, 3, 1, 1, 4, 4],
        )
        .unwrap();
        assert_eq!(layer.kind(), LayerKind::Index);
        assert_relative_eq!(layer.sample(Vec2::new(0.5, 1.5), 0.0, false).unwrap(), 1.0);
    }
}
