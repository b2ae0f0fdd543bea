// Facade that dispatches to either the real host or a mock in tests.

use std::io;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockHost;
use crate::pal::{BuildTargetHost, CommandOutput, Host};

/// Facade over host operations, dispatching to real or mock implementation.
///
/// In production, this always uses `BuildTargetHost`. In tests, it can also wrap a
/// `MockHost` for controlled test scenarios.
#[derive(Clone)]
pub(crate) enum HostFacade {
    /// Real host implementation.
    Target(&'static BuildTargetHost),

    /// Mock host for testing.
    #[cfg(test)]
    Mock(Arc<MockHost>),
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl std::fmt::Debug for HostFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(_) => f.debug_struct("HostFacade::Target").finish(),
            #[cfg(test)]
            Self::Mock(_) => f.debug_struct("HostFacade::Mock").finish(),
        }
    }
}

/// Static instance of the real host for production use.
static BUILD_TARGET_HOST: BuildTargetHost = BuildTargetHost;

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl HostFacade {
    /// Creates a facade using the real host.
    pub(crate) const fn target() -> Self {
        Self::Target(&BUILD_TARGET_HOST)
    }

    /// Creates a facade wrapping a mock host (test builds only).
    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockHost) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Host for HostFacade {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self {
            Self::Target(host) => host.read_to_string(path),
            #[cfg(test)]
            Self::Mock(mock) => mock.read_to_string(path),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        match self {
            Self::Target(host) => host.exists(path),
            #[cfg(test)]
            Self::Mock(mock) => mock.exists(path),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        match self {
            Self::Target(host) => host.read_dir(path),
            #[cfg(test)]
            Self::Mock(mock) => mock.read_dir(path),
        }
    }

    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        match self {
            Self::Target(host) => host.run(program, args),
            #[cfg(test)]
            Self::Mock(mock) => mock.run(program, args),
        }
    }
}
