// Boundary digitizing, area sizing and NDVI analysis lifecycle

pub mod analysis;
pub mod drawing;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod ndvi;
pub mod types;
pub mod workspace;
