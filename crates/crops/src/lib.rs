//! Crops domain module: the harvested batch and its lifecycle.
//!
//! The crop row is the anchor every traceability lookup joins against; it is
//! created once by a farmer and never deleted.

pub mod crop;

pub use crop::{Crop, CropStatus, NewCrop};
