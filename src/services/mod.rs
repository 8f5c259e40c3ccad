pub use pushkind_common::services::errors::{ServiceError, ServiceResult};

pub mod main;
pub mod pricing;
pub mod rules;
