pub mod generation;
pub mod infra;
pub mod judge;
pub mod prompts;
pub mod ranking;
pub mod service;
pub mod similarity;
pub mod storage;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod timeout;
pub mod traits;

pub use generation::{BatchRequest, CancelFlag, GenerationLoop};
pub use judge::{CooldownGate, QualityJudge};
pub use ranking::{RankingEngine, RecommendRequest};
pub use service::{Collaborators, SkillsService};
pub use similarity::SimilarityMaintainer;
pub use storage::StorageCoordinator;
