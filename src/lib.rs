pub mod api;
pub mod artifacts;
pub mod config;
pub mod errors;
pub mod extract;
pub mod review;
pub mod source;
pub mod util;
