pub mod probes;

pub use probes::{probe_routes, ProbeState};
