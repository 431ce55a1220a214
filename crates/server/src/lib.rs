pub mod routes;
pub mod startup;
pub mod params;
pub mod errors;
pub mod openapi;

pub use startup::run;
