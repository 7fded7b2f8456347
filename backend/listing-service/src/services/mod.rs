pub mod batch;
pub mod csv_export;
pub mod slug;

pub use batch::{validate_images, BatchProcessor, GeneratedCsv};
pub use csv_export::encode;
pub use slug::slugify;
