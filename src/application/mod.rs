//! Application services wiring the domain to cache and queue infrastructure.

pub mod error;
pub mod recipes;
pub mod tasks;

pub use error::AppError;
pub use recipes::RecipeService;
