pub mod arcgis;
pub mod cdc;
pub mod fips;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod soda;
pub mod traits;

pub use arcgis::ArcGis;
pub use cdc::{CdcVaccineAllocations, CdcVaccineTotal};
pub use http::HttpTransport;
pub use soda::Soda;
pub use traits::{PaginatedFetcher, ScraperTrait, Transport};
