//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Every value reaches SQL through a
//! bind parameter.

pub mod annotation_repo;
pub mod experimenter_repo;
pub mod hierarchy_repo;
pub mod link_repo;
pub mod projection_repo;

pub use annotation_repo::AnnotationRepo;
pub use experimenter_repo::ExperimenterRepo;
pub use hierarchy_repo::HierarchyRepo;
pub use link_repo::AnnotationLinkRepo;
pub use projection_repo::ProjectionRepo;
