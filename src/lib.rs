pub mod detect;
pub mod resolver;

pub use detect::{detect_platform, DetectedLink};
pub use resolver::{DeliveryOutcome, MediaResolver, Provider, ResolveError, ResolverConfig};
