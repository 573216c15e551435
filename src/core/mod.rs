pub mod config;
pub mod item;
pub mod paths;
pub mod querylog;
pub mod reconcile;
pub mod store;
pub mod validation;
