//! Domain layer - Core business logic and port definitions
//!
//! This module defines the core traits (ports) that adapters implement and
//! the condition/status model shared by every ensurer, following hexagonal
//! architecture principles.

pub mod conditions;
pub mod ports;

pub use conditions::*;
pub use ports::*;
