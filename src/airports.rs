use geo::{Contains, LineString, Point, Polygon};
use tracing::trace;

/// Calculate the distance between two points using the Haversine formula
/// Returns distance in meters
pub(crate) fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// An airport reference point used for geofence attribution.
///
/// Matching uses the boundary polygon when one is configured, otherwise a
/// fixed-radius proximity test around the reference center.
#[derive(Debug, Clone)]
pub struct Airport {
    /// Airport identifier (IATA/local code, e.g. "XNA")
    pub ident: String,
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Optional hand-specified boundary polygon
    pub boundary: Option<Polygon<f64>>,
}

impl Airport {
    pub fn new(ident: &str, latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            ident: ident.to_string(),
            name: None,
            latitude_deg,
            longitude_deg,
            boundary: None,
        }
    }

    /// Attach a boundary polygon given as (lat, lon) vertices.
    pub fn with_boundary(mut self, vertices: &[(f64, f64)]) -> Self {
        let ring: Vec<(f64, f64)> = vertices.iter().map(|&(lat, lon)| (lon, lat)).collect();
        self.boundary = Some(Polygon::new(LineString::from(ring), vec![]));
        self
    }
}

/// Matches a coordinate to at most one airport.
///
/// Airports are checked in their configured order and the first match wins,
/// so overlapping zones resolve deterministically.
#[derive(Debug, Clone)]
pub struct GeofenceMatcher {
    airports: Vec<Airport>,
    radius_meters: f64,
}

impl GeofenceMatcher {
    pub fn new(airports: Vec<Airport>, radius_meters: f64) -> Self {
        Self {
            airports,
            radius_meters,
        }
    }

    /// Return the airport the point is attributed to, if any.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Option<&Airport> {
        for airport in &self.airports {
            let matched = match &airport.boundary {
                Some(polygon) => polygon.contains(&Point::new(longitude, latitude)),
                None => {
                    haversine_distance(
                        airport.latitude_deg,
                        airport.longitude_deg,
                        latitude,
                        longitude,
                    ) <= self.radius_meters
                }
            };
            if matched {
                trace!(
                    "Position {:.6}, {:.6} attributed to airport {}",
                    latitude, longitude, airport.ident
                );
                return Some(airport);
            }
        }
        None
    }

    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }
}
