pub mod copy;
pub mod engine;
pub mod guard;

pub use copy::{CopyStats, EXCLUDED_DIRS, copy_tree, is_empty_dir, remove_tree};
pub use engine::{PromotionOutcome, PromotionStatus, PublishEngine, ScanReport};
pub use guard::{ScanGuard, ScanLock};
