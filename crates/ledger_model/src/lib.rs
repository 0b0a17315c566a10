//! Pure ledger snapshot model for the lending assertion engine
//! No I/O, no unwrap/panic, all math functions total

pub mod state;
pub mod math;
pub mod helpers;

// Re-export commonly used types
pub use alloy_primitives::Address;
pub use state::*;
pub use helpers::*;
