mod coordinate;
mod location;
mod reading;
mod survey_point;

pub use coordinate::{Coordinate, CoordinateError};
pub use location::{AcquisitionMethod, Location, LocationMetadata};
pub use reading::Reading;
pub use survey_point::SurveyPoint;
