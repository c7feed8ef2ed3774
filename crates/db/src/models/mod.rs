//! Database row types and their conversions into core domain types.

pub mod annotation;
pub mod counts;
pub mod experimenter;
pub mod hierarchy;
pub mod link;
