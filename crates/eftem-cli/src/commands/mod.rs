pub mod config;
pub mod edges;
pub mod map;
