pub mod manifest;

use std::path::PathBuf;
use tracing::debug;

pub use manifest::{AppIdentity, ManifestFields, ManifestResolver};

/// What the host environment reports about the running package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub family_name: String,
    /// The package-level display name property.
    pub display_name: String,
    pub install_root: PathBuf,
}

/// Source of package identity for the running process.
pub trait PackageSource: Send + Sync {
    /// Returns `None` when the process has no package identity.
    fn current(&self) -> Option<PackageInfo>;
}

/// Always reports the same package. Used by hosts that know their identity
/// up front, and in tests.
#[derive(Debug, Clone)]
pub struct FixedPackage(pub PackageInfo);

impl PackageSource for FixedPackage {
    fn current(&self) -> Option<PackageInfo> {
        Some(self.0.clone())
    }
}

/// Queries `Windows.ApplicationModel.Package.Current`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentPackage;

impl PackageSource for CurrentPackage {
    #[cfg(windows)]
    fn current(&self) -> Option<PackageInfo> {
        match crate::utils::com::with_apartment(query_current_package) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("No package identity: {}", e);
                None
            }
        }
    }

    #[cfg(not(windows))]
    fn current(&self) -> Option<PackageInfo> {
        debug!("Package identity is only available on Windows");
        None
    }
}

#[cfg(windows)]
fn query_current_package() -> crate::error::Result<PackageInfo> {
    use windows::ApplicationModel::Package;

    let package = Package::Current()?;
    let family_name = package.Id()?.FamilyName()?.to_string();
    let display_name = package.DisplayName()?.to_string();
    let install_root = PathBuf::from(package.InstalledLocation()?.Path()?.to_string());

    Ok(PackageInfo {
        family_name,
        display_name,
        install_root,
    })
}
