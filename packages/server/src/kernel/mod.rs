//! Infrastructure wiring: external service adapters and the
//! per-connection session registry.

pub mod intent_adapter;
pub mod registry;

pub use intent_adapter::IntentAdapter;
pub use registry::{SessionRegistry, StartRefusal};
