//! Geo-fencing: haversine distance and the radius test.

use serde::{Deserialize, Serialize};

/// A circular geo-fence: centre coordinates plus a radius in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeoFence {
    /// Great-circle distance, in kilometres, between this fence's centre and
    /// a `(lat, lon)` point.
    pub fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), lat.to_radians());
        let d_lat = (lat - self.lat).to_radians();
        let d_lon = (lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }

    /// Whether `(lat, lon)` falls within this fence's radius.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.distance_km(lat, lon) <= self.radius_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_point_is_within_any_positive_radius() {
        let fence = GeoFence {
            lat: 51.5074,
            lon: -0.1278,
            radius_km: 1.0,
        };
        assert!(fence.contains(51.5074, -0.1278));
    }

    #[test]
    fn distant_point_is_excluded() {
        // London vs. New York, roughly 5570 km apart.
        let fence = GeoFence {
            lat: 51.5074,
            lon: -0.1278,
            radius_km: 100.0,
        };
        assert!(!fence.contains(40.7128, -74.0060));
    }
}
