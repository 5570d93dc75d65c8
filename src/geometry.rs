use crate::domain::Coordinate;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters, by the spherical
/// law of haversines, rounded to centimeter precision.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi_a = a.lat.to_radians();
    let phi_b = b.lat.to_radians();
    let delta_phi = (b.lat - a.lat).to_radians();
    let delta_lambda = (b.lng - a.lng).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round_to_cm(EARTH_RADIUS_M * c)
}

/// Crossing-number (ray cast) containment test over a closed ring of at least
/// three vertices, treating latitude as x and longitude as y. Classification
/// of degenerate (collinear or zero-area) rings is undefined.
pub fn point_in_polygon(point: Coordinate, vertices: &[Coordinate]) -> bool {
    debug_assert!(vertices.len() >= 3, "a polygon requires at least 3 vertices");

    let (x, y) = (point.lat, point.lng);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].lat, vertices[i].lng);
        let (xj, yj) = (vertices[j].lat, vertices[j].lng);

        let crosses = (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Distance in meters from `point` to the segment `seg_start`..`seg_end`.
///
/// The projection parameter is computed on the raw (lat, lng) plane and
/// clamped to the segment, so projections beyond an endpoint snap to that
/// endpoint; the final distance is the haversine to the projected point. The
/// mix of a planar projection with a geodesic distance is a deliberate
/// small-area approximation.
pub fn distance_to_segment(point: Coordinate, seg_start: Coordinate, seg_end: Coordinate) -> f64 {
    let dx = seg_end.lat - seg_start.lat;
    let dy = seg_end.lng - seg_start.lng;
    let length_sq = dx * dx + dy * dy;

    let t = if length_sq == 0.0 {
        0.0 // Degenerate segment, both endpoints coincide
    } else {
        let t = ((point.lat - seg_start.lat) * dx + (point.lng - seg_start.lng) * dy) / length_sq;
        t.clamp(0.0, 1.0)
    };

    let projected = Coordinate {
        lat: seg_start.lat + t * dx,
        lng: seg_start.lng + t * dy,
    };

    haversine_distance(point, projected)
}

fn round_to_cm(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}
