use crate::domain::Location;
use chrono::{DateTime, Utc};

/// A measurement registered against the locked building polygon, annotated
/// with its containment classification and the distance to every vertex and
/// side. Distances are meters, in vertex/edge order.
#[derive(Clone, Debug, PartialEq)]
pub struct SurveyPoint {
    pub id: String,
    pub location: Location,
    pub inside: bool,
    pub vertex_distances: Vec<f64>,
    pub side_distances: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}
