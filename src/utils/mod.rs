pub mod env_utils;
pub mod single_flight;

pub use env_utils::*;
pub use single_flight::{Flight, SingleFlight};
