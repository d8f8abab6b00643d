pub mod formula;
pub mod ledger;

pub use formula::{calculate_points, checked_points, derive_difficulty, level_for_points, Difficulty};
pub use ledger::{balance, rank_leaderboard, TransactionKind};
