/// Lowest platform API level the primary review service supports.
pub const MIN_PLATFORM_VERSION: u32 = 21;

/// Environment facts gating the primary review service. Derived fresh on every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    pub provider_package_installed: bool,
    pub provider_services_reachable: bool,
    pub platform_version_sufficient: bool,
}

impl EnvironmentSnapshot {
    pub fn all_met() -> Self {
        Self {
            provider_package_installed: true,
            provider_services_reachable: true,
            platform_version_sufficient: true,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.provider_package_installed
            && self.provider_services_reachable
            && self.platform_version_sufficient
    }
}

pub fn platform_version_sufficient(version: u32) -> bool {
    version >= MIN_PLATFORM_VERSION
}

/// Answers "is a review provider usable right now?". Must not fail: an absent
/// signal is reported as `false`.
pub trait EnvironmentProbe: Send + Sync {
    fn probe(&self) -> EnvironmentSnapshot;
}

/// Probe returning a fixed snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub EnvironmentSnapshot);

impl EnvironmentProbe for FixedProbe {
    fn probe(&self) -> EnvironmentSnapshot {
        self.0
    }
}
