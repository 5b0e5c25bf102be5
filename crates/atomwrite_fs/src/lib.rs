//! Native OS adapters for the atomwrite ports.

pub mod backend;
pub mod metadata;
pub mod publish;
pub mod sync;
pub mod temp;
pub mod util;

use std::sync::Arc;

use atomwrite_core::Platform;

pub use backend::FsBackend;
pub use metadata::{stat_info, OsPreserver};
pub use publish::OsPublisher;
pub use sync::OsSyncer;
pub use temp::{OsEntropy, TempNamer};

/// Platform wired to the real filesystem, kernel CSPRNG and this target's sync/rename primitives.
pub fn native_platform() -> Platform {
    Platform::new(
        Arc::new(FsBackend::new()),
        Arc::new(OsEntropy),
        Arc::new(OsSyncer),
        Arc::new(OsPublisher),
        Arc::new(OsPreserver),
    )
}
