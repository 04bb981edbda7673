//! Maps shaded fragments onto the 3D cluster grid.
//!
//! The grid splits the screen uniformly in x and y and the view depth
//! linearly between the near and far clip distances.

pub mod locator;

pub use locator::{ClusterCoord, ClusterLocator};
