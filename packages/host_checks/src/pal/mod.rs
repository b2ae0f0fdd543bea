// Platform abstraction layer for host_checks.
//
// Everything the checks observe about the host (sysfs files, the role variables file, the output
// of ovs-vsctl and friends) is reached through the `Host` trait so that the checks can be tested
// against a mock host. The layout is abstraction (trait) → facade (enum) → real implementation.

mod host;

pub(crate) use host::*;
