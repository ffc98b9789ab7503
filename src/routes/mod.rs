//! Route definitions for the ZapDrive API.

pub mod health;
pub mod probes;
pub mod scans;
