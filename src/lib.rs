//! mizu - staged transaction pipelines for the Mizu water-cooler contracts
//!
//! The library half of the binary: configuration, the contract's entry
//! function table, package compilation and the concrete flows.

pub mod config;
pub mod contract;
pub mod flows;
pub mod package;

pub use config::{ConfigError, MizuConfig};
pub use flows::{build_flow, find_flow, FlowError, FlowInfo, Role, FLOWS};
pub use package::{compile, CompiledPackage, PackageError};
