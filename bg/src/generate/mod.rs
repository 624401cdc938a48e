//! Generator agent

mod generator;

pub use generator::{EpicSet, Generated, GeneratorAgent, RevisionRequest, StorySet};
