//! Regular sampling grids over a molecular bounding box.

use crate::core::constants::BOHR_TO_ANGSTROM;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use nalgebra::Point3;
use serde::{Serialize, Serializer};

/// Sampling parameters for a volumetric query.
#[derive(Debug, Clone, Serialize)]
pub struct GridSpec {
    /// Points per axis.
    pub resolution: usize,
    /// Margin added on every side of the atomic bounding box, in
    /// angstrom.
    pub padding: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            resolution: 60,
            padding: 4.0,
        }
    }
}

impl GridSpec {
    /// Axis-aligned box around the given positions (angstrom) plus
    /// padding, discretized at this spec's resolution.
    pub fn layout(&self, positions_angstrom: &[Point3<f64>]) -> GridLayout {
        debug_assert!(!positions_angstrom.is_empty());
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in positions_angstrom {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        let origin = [
            min[0] - self.padding,
            min[1] - self.padding,
            min[2] - self.padding,
        ];
        let extent = [
            (max[0] - min[0]) + 2.0 * self.padding,
            (max[1] - min[1]) + 2.0 * self.padding,
            (max[2] - min[2]) + 2.0 * self.padding,
        ];
        GridLayout {
            shape: [self.resolution; 3],
            origin,
            extent,
        }
    }
}

/// Geometry of a sampling grid: origin and extent in angstrom,
/// `shape[0] * shape[1] * shape[2]` points with x slowest-varying.
#[derive(Debug, Clone)]
pub struct GridLayout {
    pub shape: [usize; 3],
    pub origin: [f64; 3],
    pub extent: [f64; 3],
}

impl GridLayout {
    pub fn num_points(&self) -> usize {
        self.shape[0] * self.shape[1] * self.shape[2]
    }

    fn step(&self, axis: usize) -> f64 {
        if self.shape[axis] > 1 {
            self.extent[axis] / (self.shape[axis] - 1) as f64
        } else {
            0.0
        }
    }

    /// Grid points in bohr, x slowest-varying, for handing to the
    /// solver's basis evaluator.
    pub fn points_bohr(&self) -> Vec<Point3<f64>> {
        let steps = [self.step(0), self.step(1), self.step(2)];
        let mut points = Vec::with_capacity(self.num_points());
        for ix in 0..self.shape[0] {
            let x = self.origin[0] + steps[0] * ix as f64;
            for iy in 0..self.shape[1] {
                let y = self.origin[1] + steps[1] * iy as f64;
                for iz in 0..self.shape[2] {
                    let z = self.origin[2] + steps[2] * iz as f64;
                    points.push(Point3::new(
                        x / BOHR_TO_ANGSTROM,
                        y / BOHR_TO_ANGSTROM,
                        z / BOHR_TO_ANGSTROM,
                    ));
                }
            }
        }
        points
    }
}

/// A sampled scalar field over a [`GridLayout`]. Serializes the field
/// as base64 over little-endian 4-byte floats, so the payload byte
/// length is exactly `nx * ny * nz * 4`.
#[derive(Debug, Clone, Serialize)]
pub struct VolumetricGrid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub origin: [f64; 3],
    pub extent: [f64; 3],
    #[serde(rename = "field_base64", serialize_with = "serialize_field")]
    pub field: Vec<f32>,
}

impl VolumetricGrid {
    pub fn new(layout: &GridLayout, field: Vec<f32>) -> Self {
        debug_assert_eq!(field.len(), layout.num_points());
        Self {
            nx: layout.shape[0],
            ny: layout.shape[1],
            nz: layout.shape[2],
            origin: layout.origin,
            extent: layout.extent,
            field,
        }
    }

    pub fn field_base64(&self) -> String {
        BASE64.encode(field_bytes(&self.field))
    }
}

fn field_bytes(field: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(field.len() * 4);
    for value in field {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn serialize_field<S: Serializer>(field: &Vec<f32>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(field_bytes(field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_pads_the_bounding_box_on_every_side() {
        let spec = GridSpec {
            resolution: 10,
            padding: 4.0,
        };
        let layout = spec.layout(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 3.0),
        ]);

        assert_eq!(layout.origin, [-4.0, -4.0, -4.0]);
        assert_eq!(layout.extent, [9.0, 10.0, 11.0]);
        assert_eq!(layout.num_points(), 1000);
    }

    #[test]
    fn points_iterate_with_x_slowest_varying() {
        let layout = GridLayout {
            shape: [2, 2, 2],
            origin: [0.0, 0.0, 0.0],
            extent: [1.0, 1.0, 1.0],
        };
        let points = layout.points_bohr();

        assert_eq!(points.len(), 8);
        // First half shares x = origin; z cycles fastest.
        assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
        assert!((points[1].z - 1.0 / BOHR_TO_ANGSTROM).abs() < 1e-12);
        assert!((points[2].y - 1.0 / BOHR_TO_ANGSTROM).abs() < 1e-12);
        assert!((points[4].x - 1.0 / BOHR_TO_ANGSTROM).abs() < 1e-12);
    }

    #[test]
    fn encoded_field_has_four_bytes_per_point() {
        let layout = GridLayout {
            shape: [3, 4, 5],
            origin: [0.0; 3],
            extent: [1.0; 3],
        };
        let grid = VolumetricGrid::new(&layout, vec![0.5; 60]);

        let decoded = BASE64.decode(grid.field_base64()).unwrap();
        assert_eq!(decoded.len(), 3 * 4 * 5 * 4);
    }

    #[test]
    fn decoding_the_field_recovers_the_values() {
        let layout = GridLayout {
            shape: [1, 1, 3],
            origin: [0.0; 3],
            extent: [1.0; 3],
        };
        let grid = VolumetricGrid::new(&layout, vec![1.0, -2.5, 0.25]);

        let decoded = BASE64.decode(grid.field_base64()).unwrap();
        let values: Vec<f32> = decoded
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![1.0, -2.5, 0.25]);
    }
}
