pub mod collect;
pub mod health;
pub mod leaderboard;
pub mod report;
pub mod rewards;
pub mod settings;
pub mod verify;
