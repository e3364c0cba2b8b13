//! Core domain types

pub mod descriptor;
pub mod result;
pub mod summary;
pub mod task;
pub mod version;

pub use descriptor::{AurPackageInfo, DescriptorBuilder, PackageDescriptor};
pub use result::BuildResult;
pub use summary::RunSummary;
pub use task::UpdateTask;
pub use version::PkgVersion;
