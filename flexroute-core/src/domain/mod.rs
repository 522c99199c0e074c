//! Domain models: candidate hosts, role modes and the published active route.

pub mod host;
pub mod routing;
