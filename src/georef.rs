//! Axis-aligned bounding-box georeference.
//!
//! The plan raster is assumed north-up and aligned with the bounding box, so a
//! pixel maps to a coordinate by linear interpolation in each axis. No
//! rotation, skew, or projection correction is applied.

use crate::error::{Error, Result};

/// Geographic extent of the raster: (lat_min, lon_min) is the south-west
/// corner, (lat_max, lon_max) the north-east corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl GeoBoundingBox {
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Result<Self> {
        if !(lat_max > lat_min && lon_max > lon_min) {
            return Err(Error::InvalidGeometry(format!(
                "bounding box corners must satisfy lat_max > lat_min and lon_max > lon_min, \
                 got ({lat_min}, {lon_min}) .. ({lat_max}, {lon_max})"
            )));
        }
        Ok(Self {
            lat_min,
            lon_min,
            lat_max,
            lon_max,
        })
    }

    /// Bounds derived from a center coordinate plus a symmetric scale, the way
    /// the map calibration sidebar supplies them.
    pub fn from_center(lat: f64, lon: f64, scale: f64) -> Result<Self> {
        Self::new(lat - scale, lon - scale, lat + scale, lon + scale)
    }
}

/// Maps a pixel position inside a `width` x `height` raster to (lat, lon).
///
/// Row 0 is the northern edge, so latitude decreases with `y`. The pixel-grid
/// corners map exactly onto the bounding-box corners.
pub fn pixel_to_lat_lon(
    x: f32,
    y: f32,
    width: u32,
    height: u32,
    bounds: &GeoBoundingBox,
) -> Result<(f64, f64)> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidGeometry(format!(
            "raster dimensions must be non-zero, got {width}x{height}"
        )));
    }
    let lat_range = bounds.lat_max - bounds.lat_min;
    let lon_range = bounds.lon_max - bounds.lon_min;
    let lat = bounds.lat_max - (y as f64 / height as f64) * lat_range;
    let lon = bounds.lon_min + (x as f64 / width as f64) * lon_range;
    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn test_bounds() -> GeoBoundingBox {
        GeoBoundingBox::new(-6.885, 109.110, -6.875, 109.120).unwrap()
    }

    #[test]
    fn corners_map_to_bounding_box_corners() {
        let b = test_bounds();
        let (w, h) = (1654, 2339);

        let (lat, lon) = pixel_to_lat_lon(0.0, 0.0, w, h, &b).unwrap();
        assert!((lat - b.lat_max).abs() < EPS && (lon - b.lon_min).abs() < EPS);

        let (lat, lon) = pixel_to_lat_lon(w as f32, 0.0, w, h, &b).unwrap();
        assert!((lat - b.lat_max).abs() < EPS && (lon - b.lon_max).abs() < EPS);

        let (lat, lon) = pixel_to_lat_lon(0.0, h as f32, w, h, &b).unwrap();
        assert!((lat - b.lat_min).abs() < EPS && (lon - b.lon_min).abs() < EPS);

        let (lat, lon) = pixel_to_lat_lon(w as f32, h as f32, w, h, &b).unwrap();
        assert!((lat - b.lat_min).abs() < EPS && (lon - b.lon_max).abs() < EPS);
    }

    #[test]
    fn center_pixel_maps_to_bounding_box_center() {
        let b = test_bounds();
        let (w, h) = (800, 600);
        let (lat, lon) = pixel_to_lat_lon(w as f32 / 2.0, h as f32 / 2.0, w, h, &b).unwrap();
        assert!((lat - (b.lat_min + b.lat_max) / 2.0).abs() < EPS);
        assert!((lon - (b.lon_min + b.lon_max) / 2.0).abs() < EPS);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let b = test_bounds();
        assert!(pixel_to_lat_lon(10.0, 10.0, 0, 600, &b).is_err());
        assert!(pixel_to_lat_lon(10.0, 10.0, 800, 0, &b).is_err());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(GeoBoundingBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(GeoBoundingBox::new(0.0, 1.0, 1.0, 0.0).is_err());
        assert!(GeoBoundingBox::new(0.0, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn from_center_is_symmetric() {
        let b = GeoBoundingBox::from_center(-6.88, 109.115, 0.005).unwrap();
        assert!((b.lat_max - b.lat_min - 0.01).abs() < EPS);
        assert!((b.lon_max - b.lon_min - 0.01).abs() < EPS);
    }
}
