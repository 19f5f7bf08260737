//! Concrete probe implementations of `sparrow_runtime::Check`, plus the
//! factory the runtime-config reconciler uses to build them.

pub mod common;
pub mod dns;
pub mod health;
pub mod latency;
pub mod registry;
pub mod traceroute;

pub use dns::DnsCheck;
pub use health::HealthCheck;
pub use latency::LatencyCheck;
pub use registry::CheckRegistry;
pub use traceroute::TracerouteCheck;
