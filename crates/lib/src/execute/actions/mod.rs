//! Step implementations.
//!
//! Each step kind has its own module: `sh` runs shell commands, `checkout`
//! clones git repositories, `compile` drives the C++ toolchain.

pub mod checkout;
pub mod compile;
pub mod sh;
