pub mod consts;
pub mod dataset;
pub mod edges;
pub mod error;
pub mod fit;
pub mod image;
pub mod io;
pub mod pipeline;
pub mod report;
