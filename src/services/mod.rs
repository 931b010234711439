pub mod clock;
pub mod deadline;
pub mod email;
pub mod token;
