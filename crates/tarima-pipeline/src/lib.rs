pub mod config;
pub mod context;
pub mod creator;
pub mod enrichment;
pub mod error;
pub mod images;
pub mod magic;
pub mod orchestrator;
pub mod rules;
pub mod staging;
pub mod validation;

pub use config::{MagicConfig, PipelineConfig};
pub use context::RunContext;
pub use creator::{TAG_FILE_CREATOR_ID, TagFileAlbumCreator};
pub use enrichment::{Enricher, EnrichmentOutcome};
pub use error::PipelineError;
pub use images::{Harvest, HarvestedImage, ImageHarvester};
pub use magic::{MagicNormalizer, MagicOutcome};
pub use orchestrator::{DirectoryProcessor, ProcessingSummary};
pub use staging::{StagedCount, Stager};
pub use validation::RuleAlbumValidator;
