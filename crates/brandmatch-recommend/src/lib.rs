//! Client for the external influencer recommendation service.
//!
//! The service ranks influencers for a [`brandmatch_core::CampaignBrief`];
//! this crate only speaks its HTTP contract and validates the envelope.

pub mod client;
pub mod error;

pub use client::{RecommendationClient, Recommendations, ServiceStatus};
pub use error::RecommendError;
