//! FASt-Mal annotation domain logic.
//!
//! Scope handling, the tag, map-annotation and comment synchronization
//! primitives, and the dataset aggregation pipeline. Everything talks to
//! storage through [`store::AnnotationStore`], so the same code runs against
//! Postgres (`fastmal-db`) and [`memory::MemoryStore`].

pub mod aggregation;
pub mod annotation;
pub mod comments;
pub mod error;
pub mod labels;
pub mod map_annotation;
pub mod memory;
pub mod roi_types;
pub mod scope;
pub mod store;
pub mod tag_state;
pub mod types;
