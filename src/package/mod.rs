//! Package restore: list parsing, planning, installer adapters and the
//! executor that ties them together.

pub mod adapter;
pub mod backup;
pub mod bootstrap;
pub mod capability;
pub mod execute;
pub mod install;
pub mod kind;
pub mod outcome;
pub mod plan;
pub mod report;
pub mod runner;
pub mod spec;
pub mod translate;

pub use adapter::{PackageManagerAdapter, adapters_for};
pub use capability::{Capabilities, CapabilityProbe, PathProbe};
pub use execute::{Executor, ExecutorOptions};
pub use install::AurHelper;
pub use kind::PackageManagerKind;
pub use outcome::{InstallResult, MultiPackagePolicy};
pub use plan::{Plan, plan, read_sources};
pub use report::RunReport;
pub use runner::{CommandRunner, DuctRunner};
