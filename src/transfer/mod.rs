//! Whole-dataset transfer: export, import, cloud restore and wipe

mod coordinator;
mod lock;

pub use coordinator::{ImportOutcome, TransferCoordinator, DEFAULT_SAFETY_KEEP};
pub use lock::{DatasetGuard, DatasetLock};
