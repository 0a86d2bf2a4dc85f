pub mod render;
pub mod templates;
pub mod workers;
