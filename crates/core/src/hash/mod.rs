pub mod content;
pub mod perceptual;
