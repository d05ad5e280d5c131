pub mod image;
pub mod sync;
pub mod types;
