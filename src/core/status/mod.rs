pub mod model;
pub mod normalizer;
pub mod probe;

pub use model::{Favicon, ServerStatus};
pub use probe::{probe, probe_many, successful};
