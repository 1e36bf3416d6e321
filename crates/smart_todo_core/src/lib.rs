pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod model;
pub mod storage;
pub mod store;
pub mod task_api;

pub use error::AppError;
pub use store::TaskStore;
pub use task_api::Session;
