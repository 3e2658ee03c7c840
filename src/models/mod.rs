pub mod config;
pub mod record;
pub mod tool;

pub use config::*;
pub use record::*;
pub use tool::*;
