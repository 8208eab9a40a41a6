pub mod buffer;
pub mod config;
pub mod controller;
pub mod index;
pub mod service;

pub use buffer::PendingPictures;
pub use config::ExtractorConfig;
pub use controller::{DeliveredFrame, ExtractorState, FrameExtractor};
pub use index::SampleIndex;
pub use service::{spawn_service, ExtractorHandle, ExtractorWorker};
