//! Demo agents.
//!
//! Two remote agents served over A2A (currency and weather) and a travel
//! assistant whose local tools sit next to their capabilities in one
//! registry.

pub mod currency;
pub mod travel;
pub mod weather;

use thiserror::Error;

use crate::capabilities::descriptor::DescriptorError;
use crate::server::host::DuplicateCapability;

pub use currency::currency_host;
pub use travel::travel_tools;
pub use weather::weather_host;

/// Errors building a demo agent host.
#[derive(Debug, Error)]
pub enum DemoHostError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateCapability),
}
