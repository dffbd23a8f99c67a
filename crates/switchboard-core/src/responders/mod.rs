//! Specialist agents the manager dispatches to

pub mod greeting;
pub mod image;

pub use greeting::GreetingResponder;
pub use image::{DEFAULT_IMAGE_PATH, ImageResponder};
