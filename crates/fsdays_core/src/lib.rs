pub mod calendar;
pub mod core_api;
pub mod fields;
pub mod forecast;
pub mod store;
pub mod sync;
pub mod xml;
pub mod zero;
