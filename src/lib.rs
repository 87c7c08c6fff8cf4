pub mod aggregate;
pub mod analysis;
pub mod app;
pub mod cli;
pub mod ext;
pub mod forge;
pub mod model;
pub mod render;
pub mod telemetry;
pub mod util;
