pub mod coverage;
pub mod error;
pub mod expand;
pub mod fake_slate;
pub mod generate;
pub mod payout;
pub mod probs;
pub mod risk;
pub mod signals;
pub mod simulate;
pub mod system;
pub mod value;

pub use error::EngineError;
pub use probs::{MatchOdds, Outcome, Prob3};
pub use risk::RiskProfile;
pub use system::{CoverageClass, GeneratedSystem, SystemConfig, SLATE_SIZE};
