//! Opportunity discovery sessions.
//!
//! This module handles:
//! - Opportunity records and chat summaries
//! - Aggregation across both catalogs with fallback
//! - The per-chat scan loop
//! - The process-wide session registry

pub mod aggregator;
pub mod opportunity;
pub mod registry;
pub mod session;

pub use aggregator::OpportunityAggregator;
pub use opportunity::{format_opportunities, Opportunity};
pub use registry::{ScanState, SessionRegistry};
pub use session::{ScanSession, MIN_SCAN_INTERVAL_SECS};
