pub mod configurator;

pub use configurator::{CodecConfiguration, CodecConfigurator};
