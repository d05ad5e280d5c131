pub mod lifecycle;
pub mod machine;
pub mod types;
