pub mod backend;
pub mod features;
