//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `review`  | `Review`         |
//! | `extract` | `Extract`        |

pub mod extract;
pub mod review;

pub use extract::cmd_extract;
pub use review::cmd_review;
