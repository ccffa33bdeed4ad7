pub mod geo;
pub mod ids;
pub mod profile;
pub mod time;

pub use geo::{Coordinates, CoordinateError};
pub use ids::{CategoryId, ReportId, SubCategoryId, UserId};
pub use profile::{Role, UserProfile};
pub use time::Timestamp;
