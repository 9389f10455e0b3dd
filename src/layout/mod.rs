//! Layout driving and page geometry

mod driver;
mod geometry;

pub use driver::LayoutDriver;
pub use geometry::{ContainerGeometry, Frame, Margins, Mode, GEOMETRY_TOLERANCE_PX};
