pub mod project;

pub use project::{LocalMetadata, MetadataPatch, Project, StoredProject};
