pub mod transit_api;

pub use transit_api::{CurrentTime, TransitApi};
