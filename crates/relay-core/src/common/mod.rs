pub mod error;
pub mod render;
pub mod types;

pub use error::{Error, Result};
pub use types::{Answer, Submission, describe};
