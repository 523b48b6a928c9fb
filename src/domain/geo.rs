use std::fmt;

use crate::entities::location::LocationPoint;

/// Inclusive `[min, max]` span of one coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateRange {
    pub min: f64,
    pub max: f64,
}

impl CoordinateRange {
    pub const fn new(min: f64, max: f64) -> Self {
        CoordinateRange { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const LONGITUDE_RANGE: CoordinateRange = CoordinateRange::new(-180.0, 180.0);
pub const LATITUDE_RANGE: CoordinateRange = CoordinateRange::new(-90.0, 90.0);

/// Rectangular search region, rendered as Flickr's `bbox` parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Box of `half_width` x `half_height` degrees centred on `point`, clamped to the given ranges.
    pub fn around(
        point: &LocationPoint,
        half_width: f64,
        half_height: f64,
        lon_range: CoordinateRange,
        lat_range: CoordinateRange,
    ) -> Self {
        BoundingBox {
            min_lon: (point.longitude - half_width).max(lon_range.min),
            min_lat: (point.latitude - half_height).max(lat_range.min),
            max_lon: (point.longitude + half_width).min(lon_range.max),
            max_lat: (point.latitude + half_height).min(lat_range.max),
        }
    }

    /// Same as [`BoundingBox::around`] with the world ranges.
    pub fn world_clamped(point: &LocationPoint, half_width: f64, half_height: f64) -> Self {
        Self::around(point, half_width, half_height, LONGITUDE_RANGE, LATITUDE_RANGE)
    }

    pub fn is_within(&self, lon_range: CoordinateRange, lat_range: CoordinateRange) -> bool {
        lon_range.contains(self.min_lon)
            && lon_range.contains(self.max_lon)
            && lat_range.contains(self.min_lat)
            && lat_range.contains(self.max_lat)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}
