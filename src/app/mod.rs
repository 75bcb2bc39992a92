pub mod engagement;
pub mod error;
pub mod feed;
pub mod notifications;
pub mod posts;
pub mod social;
pub mod stats;
pub mod visitors;

pub use error::{ServiceError, ServiceResult};
