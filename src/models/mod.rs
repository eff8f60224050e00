mod metrics;
mod profile;

pub use metrics::*;
pub use profile::*;
