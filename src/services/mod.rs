pub mod decay;
pub mod fuzzy;
pub mod genre;
pub mod profile_builder;
pub mod profiles;
pub mod recommendations;
pub mod scoring;
pub mod weights;

pub use profile_builder::{ProfileBuilder, WatchWeighting};
pub use profiles::ProfileService;
pub use scoring::{calculate_similarity, ScoringOptions, SimilarityScorer};
pub use weights::{redistribute_weights, WeightConfig};
