//! Lead store implementations.

mod memory;
mod postgres;

pub use memory::MemoryLeadStore;
pub use postgres::PostgresLeadStore;
