//! ODT Model
//!
//! The values the SaveChanges oracle reasons about:
//!
//! - [`DescriptorData`]: a tracked entity or link with its pending state
//! - [`ChangeSetSnapshot`]: immutable, change-ordered descriptors captured
//!   before a save
//! - [`ServiceModel`]: entity type to entity set resolution
//! - [`SaveRequest`], [`ResponsePreference`], [`ProtocolVersion`]: what
//!   shapes the expected traffic
//! - [`DataServiceResponseData`]: predicted or observed per-change results
//! - [`HttpRequestData`], [`HttpResponseData`]: captured wire exchanges
//!
//! # Example
//!
//! ```rust,ignore
//! use odt_model::{ChangeSetSnapshot, EntityDescriptorData, EntityState};
//!
//! let snapshot = ChangeSetSnapshot::new(vec![
//!     EntityDescriptorData::new(1, "Ns.Customer", EntityState::Added).into(),
//! ])?;
//! assert_eq!(snapshot.pending().count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod descriptor;
mod error;
mod options;
mod response;
mod service;
mod snapshot;
mod wire;

pub use descriptor::{
    DescriptorData, DescriptorId, EntityDescriptorData, EntityState, LinkDescriptorData,
};
pub use error::{ModelError, ModelResult};
pub use options::{
    merge_method, ProtocolVersion, ResponsePreference, SaveChangesOptions,
    SaveRequest, VersionPair,
};
pub use response::{BatchStatus, ChangeOperationResponseData, DataServiceResponseData};
pub use service::{EntityTypeInfo, ServiceModel};
pub use snapshot::ChangeSetSnapshot;
pub use wire::{header, HttpExchange, HttpRequestData, HttpResponseData};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
