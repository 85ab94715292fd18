pub mod automation;
pub mod collect;
pub mod commons;
pub mod error;
pub mod geo_core;
pub mod prediction;
pub mod raster;
pub mod settings;

pub use error::{CollectError, CollectResult, RemoteFailure};
