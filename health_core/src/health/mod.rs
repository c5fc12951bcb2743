pub mod aggregator;
pub mod check;
pub mod checks;
pub mod discovery;
pub mod params;
pub mod registry;
pub mod status;


pub use aggregator::{Aggregator, CheckReport, HealthReport, SHUTDOWN_MESSAGE};
pub use check::{Check, CheckMeta, CheckOutcome};
pub use checks::{FilesystemCheck, FnCheck, MemoryCheck};
pub use discovery::{CheckDescription, MetaDocument};
pub use params::QueryParams;
pub use registry::{Registry, RESERVED_KEYS};
pub use status::{ProbeType, Status};
