//! Geodesy primitives: positions, bounds, and great-circle distance.

use serde::{Deserialize, Serialize};

/// Kilometers spanned by one degree of latitude.
pub const KM_PER_DEG_LAT: f64 = 110.574;

/// Target edge length of a primary grid cell, in kilometers.
pub const CELL_EDGE_KM: f64 = 10.0;

/// Mean Earth radius in kilometers (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Angular step giving roughly [`CELL_EDGE_KM`] square cells at the equator.
///
/// The same step is applied to both axes, so cells narrow east-west away from
/// the equator. Accepted approximation.
#[must_use]
pub fn default_step_deg() -> f64 {
    CELL_EDGE_KM / KM_PER_DEG_LAT
}

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// An axis-aligned geographic rectangle, south-west and north-east corners.
///
/// Serialized in corner-pair form, `[[latSW, lonSW], [latNE, lonNE]]`, the
/// wire shape event consumers already expect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub sw: LatLon,
    pub ne: LatLon,
}

impl Serialize for GeoBounds {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [[self.sw.lat, self.sw.lon], [self.ne.lat, self.ne.lon]].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GeoBounds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [[south, west], [north, east]] = <[[f64; 2]; 2]>::deserialize(deserializer)?;
        Ok(Self::from_edges(south, west, north, east))
    }
}

impl GeoBounds {
    #[must_use]
    pub const fn new(sw: LatLon, ne: LatLon) -> Self {
        Self { sw, ne }
    }

    /// Build from edge coordinates (south, west, north, east).
    #[must_use]
    pub const fn from_edges(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            sw: LatLon::new(south, west),
            ne: LatLon::new(north, east),
        }
    }

    #[must_use]
    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.sw.lat + self.ne.lat) / 2.0,
            (self.sw.lon + self.ne.lon) / 2.0,
        )
    }

    /// Height (degrees latitude) and width (degrees longitude).
    #[must_use]
    pub fn span(&self) -> (f64, f64) {
        (self.ne.lat - self.sw.lat, self.ne.lon - self.sw.lon)
    }

    /// Degenerate bounds enclose no area and enumerate no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ne.lat <= self.sw.lat || self.ne.lon <= self.sw.lon
    }

    /// Half-open containment: a point on the north/east edge belongs to the
    /// neighboring cell, so tiling bounds never overlap.
    #[must_use]
    pub fn contains(&self, point: LatLon) -> bool {
        point.lat >= self.sw.lat
            && point.lat < self.ne.lat
            && point.lon >= self.sw.lon
            && point.lon < self.ne.lon
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.sw.lat < other.ne.lat
            && self.ne.lat > other.sw.lat
            && self.sw.lon < other.ne.lon
            && self.ne.lon > other.sw.lon
    }

    /// Smallest bounds containing `self` and `point`.
    #[must_use]
    pub fn extended_to(&self, point: LatLon) -> Self {
        Self::from_edges(
            self.sw.lat.min(point.lat),
            self.sw.lon.min(point.lon),
            self.ne.lat.max(point.lat),
            self.ne.lon.max(point.lon),
        )
    }

    /// Bounds grown by `fraction` of each span on every side.
    #[must_use]
    pub fn padded(&self, fraction: f64) -> Self {
        let (height, width) = self.span();
        let dlat = height * fraction;
        let dlon = width * fraction;
        Self::from_edges(
            self.sw.lat - dlat,
            self.sw.lon - dlon,
            self.ne.lat + dlat,
            self.ne.lon + dlon,
        )
    }
}

/// Great-circle distance between two positions, in kilometers.
#[must_use]
pub fn haversine_km(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_step_is_roughly_ten_kilometers() {
        let step = default_step_deg();
        assert!((step - 0.0904).abs() < 0.001);
        assert!((step * KM_PER_DEG_LAT - CELL_EDGE_KM).abs() < 1e-9);
    }

    #[test]
    fn containment_is_half_open() {
        let bounds = GeoBounds::from_edges(40.0, -105.0, 41.0, -104.0);
        assert!(bounds.contains(LatLon::new(40.0, -105.0)));
        assert!(bounds.contains(LatLon::new(40.5, -104.5)));
        assert!(!bounds.contains(LatLon::new(41.0, -104.5)));
        assert!(!bounds.contains(LatLon::new(40.5, -104.0)));
    }

    #[test]
    fn empty_bounds_detected() {
        assert!(GeoBounds::from_edges(40.0, -105.0, 40.0, -104.0).is_empty());
        assert!(GeoBounds::from_edges(40.0, -105.0, 41.0, -105.0).is_empty());
        assert!(!GeoBounds::from_edges(40.0, -105.0, 40.1, -104.9).is_empty());
    }

    #[test]
    fn extend_and_pad_grow_bounds() {
        let bounds = GeoBounds::from_edges(40.0, -105.0, 41.0, -104.0);
        let extended = bounds.extended_to(LatLon::new(39.0, -106.0));
        assert_eq!(extended.sw, LatLon::new(39.0, -106.0));
        assert_eq!(extended.ne, bounds.ne);

        let padded = bounds.padded(0.5);
        assert!((padded.sw.lat - 39.5).abs() < 1e-12);
        assert!((padded.ne.lon - -103.5).abs() < 1e-12);
    }

    #[test]
    fn bounds_serialize_in_corner_pair_form() {
        let bounds = GeoBounds::from_edges(40.1, -105.2, 40.3, -104.9);
        let json = serde_json::to_value(bounds).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!([[40.1, -105.2], [40.3, -104.9]])
        );
        let restored: GeoBounds = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, bounds);
    }

    #[test]
    fn haversine_matches_known_distances() {
        let london = LatLon::new(51.5007, -0.1246);
        let paris = LatLon::new(48.8566, 2.3522);
        let d = haversine_km(london, paris);
        assert!((d - 342.8).abs() < 1.0, "London-Paris drifted: {d}");

        assert!(haversine_km(london, london).abs() < 1e-9);

        let one_deg = haversine_km(LatLon::new(0.0, 0.0), LatLon::new(1.0, 0.0));
        assert!((one_deg - 111.2).abs() < 0.1);
    }
}
