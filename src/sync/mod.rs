//! Clock synchronization subsystem

pub mod clock;
pub mod engine;
pub mod events;
pub mod history;

pub use clock::{MonotonicClock, OutputClock, SystemClock};
pub use engine::{BufferClass, Correction, EngineStats, SyncEngine, SyncState};
pub use events::{EventBus, EventSubscription, SyncEvent, SyncEventKind};
pub use history::{LtcSample, SampleHistory};
