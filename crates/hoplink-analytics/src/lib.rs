//! Click analytics: recording and aggregation.
//!
//! The [`ClickRecorder`] appends click events off the redirect path
//! through a bounded queue; [`summarize`] and [`overview`] compute
//! rolling statistics on demand. A lost click event is an acceptable
//! degradation, a lost redirect is not — nothing in this crate ever
//! surfaces an error to the request that triggered it.

pub mod aggregate;
pub mod classify;
pub mod error;
pub mod recorder;
pub mod request;

pub use aggregate::{overview, summarize, ClickSummary, DayCount, LinkDigest, Overview, TableEntry};
pub use classify::{UaClassifier, UaProfile, WootheeClassifier};
pub use error::AnalyticsError;
pub use recorder::ClickRecorder;
pub use request::RequestMetadata;
