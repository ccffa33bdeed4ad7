//! Reverse geocoding through an ordered chain of providers with a
//! coordinate fallback that cannot fail.

mod providers;
mod resolver;

pub use providers::{BackendProxyProvider, BigDataCloudProvider, GeocodeProvider, OpenCageProvider};
pub use resolver::{AddressSource, GeocodeResolver, GeocodeResult};
