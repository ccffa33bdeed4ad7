mod resources;
mod types;

pub use resources::ResourceApi;
pub use types::{Category, CategoryWithSubcategories, NewReport, Report, ReportFilter, SubCategory};
