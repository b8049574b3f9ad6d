pub mod config;
pub mod logging;

pub mod artifact;
pub mod checksum;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod executor;
pub mod plan;
pub mod registry;

pub use artifact::{ArtifactDescriptor, Identity, SourceZone};
pub use checksum::{ChecksumTable, IntegrityChecker, Verification};
pub use engine::{AcquisitionEngine, BatchOutcome};
pub use error::{AcquisitionError, DownloadFailure, FetchError, IntegrityError, PlanError};
pub use executor::{CommandExecutor, CurlExecutor, DownloadExecutor};
pub use registry::{BinarySet, ResultRegistry};
