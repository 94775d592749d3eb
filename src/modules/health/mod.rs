//! Kubernetes readiness and liveness probes.

pub mod controller;
pub mod router;
