//! Value Object Module

pub mod display_name;
pub mod email;
pub mod referral_code;
pub mod user_role;
