pub mod crud;
pub mod interface;
pub mod model;

pub use crud::BikeCrud;
pub use interface::BikeError;
