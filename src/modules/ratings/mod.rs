pub mod crud;
pub mod interface;
pub mod model;

pub use crud::{recompute_aggregates_for_bike, RatingCrud};
pub use interface::RatingError;
