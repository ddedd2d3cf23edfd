//! Request handlers.

pub mod downloads;
pub mod health;
pub mod video_info;

pub use downloads::*;
pub use health::*;
pub use video_info::*;

use serde::Serialize;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
