//! Domain document models

mod brd;
mod epic;
mod id;

pub use brd::{
    BrdDocument, DocumentKind, Priority, Requirement, SECTION_BUSINESS_CONTEXT, SECTION_COMPONENTS,
    SECTION_DEPENDENCIES, SECTION_FILES, SECTION_FUNCTIONAL, SECTION_OBJECTIVES, SECTION_TECHNICAL,
};
pub use epic::{Epic, EffortSize, UserStory, topological_sort, validate_dependency_graph};
pub use id::{generate_id, slugify};
