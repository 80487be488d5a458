//! Health checking: token status plus one probe per provider, folded into a
//! tri-state verdict.

mod checker;
mod probe;
mod status;

pub use {
    checker::HealthChecker,
    probe::{GatewayProbe, HealthProbe},
    status::{ComponentHealth, Dependency, HealthState, HealthStatus},
};
