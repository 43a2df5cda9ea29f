//! The enrichment chain: a fixed, ordered sequence of stages that turn a raw
//! tracker payload's short keys into a validated [`atomic::AtomicEvent`].
//!
//! Each stage implements [`Enrichment`]. [`Chain`] runs them in registration
//! order against a [`atomic::TemporaryAtomicEvent`]; a stage failing aborts
//! the whole candidate event (the raw payload it came from is rejected as a
//! unit by the caller, not partially processed).

mod authentication;
mod campaign;
mod context_extraction;
mod device;
mod error;
mod event_extraction;
mod geoip;
mod pii;
mod postprocessing;
mod processing_info;
mod tenant;
mod transform;

pub use authentication::AuthenticationEnrichment;
pub use campaign::CampaignEnrichment;
pub use context_extraction::ContextExtractionEnrichment;
pub use device::DeviceEnrichment;
pub use error::EnrichError;
pub use event_extraction::{
    schema_for_event_type, EventExtractionEnrichment, PP_SCHEMA, PV_SCHEMA, SE_SCHEMA, TI_SCHEMA, TR_SCHEMA,
};
pub use geoip::GeoIpEnrichment;
pub use pii::PiiEnrichment;
pub use postprocessing::PostProcessingEnrichment;
pub use processing_info::ProcessingInfoEnrichment;
pub use tenant::TenantEnrichment;
pub use transform::{transform_ip, transform_tstamp, TransformEnrichment};

use atomic::TemporaryAtomicEvent;

/// One stage of the enrichment chain. `enrich` mutates the scratchpad in
/// place; stages run in the order they were pushed onto a [`Chain`].
#[async_trait::async_trait]
pub trait Enrichment: Send + Sync {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError>;
}

/// An ordered, fixed sequence of enrichment stages.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Box<dyn Enrichment>>,
}

impl Chain {
    pub fn new() -> Self {
        Chain { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: Box<dyn Enrichment>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub async fn run(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        for stage in &self.stages {
            stage.enrich(event).await?;
        }
        Ok(())
    }
}
