pub mod metadata;

pub use metadata::{ErrorResponse, Metadata, ResponseInfo};
