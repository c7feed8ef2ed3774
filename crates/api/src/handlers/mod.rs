pub mod dataset;
pub mod roi_comments;
pub mod roi_types;
pub mod shape_annotation;
pub mod tag_state;
pub mod user;
