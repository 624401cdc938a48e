//! Context aggregation and compression

mod aggregator;
mod compress;
mod model;

pub use aggregator::{ContextAggregator, extract_keywords};
pub use compress::compress;
pub use model::{
    AggregatedContext, ApiContract, ArchitectureView, ComponentInfo, FileContext, ImplementationView,
};
