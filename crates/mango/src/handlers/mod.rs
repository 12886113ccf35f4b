pub mod error;
pub mod health;
pub mod questions;
pub mod surveys;

pub use error::AppError;
