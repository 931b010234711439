pub mod account;
pub mod crud;
pub mod interface;
pub mod model;
pub mod schema;
pub mod verifier;

pub use account::AccountCrud;
pub use crud::AuthCrud;
pub use interface::AuthError;
pub use verifier::TokenVerifier;
