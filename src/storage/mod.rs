pub mod loader;
pub mod memory;
pub mod refresh;
