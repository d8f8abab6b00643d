pub mod catalog;
pub mod manager;

pub use catalog::{Coupon, COUPONS};
pub use manager::RewardsManager;
