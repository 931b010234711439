pub mod crud;
pub mod interface;
pub mod model;
pub mod schema;

pub use crud::ReviewCrud;
pub use interface::ReviewError;
