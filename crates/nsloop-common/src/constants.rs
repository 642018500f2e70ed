//! System-wide constants and well-known paths.

/// Network namespace of the calling thread.
///
/// `/proc/self/ns/net` names the thread-group leader, which is not the same
/// thing once a worker thread has switched.
pub const THREAD_SELF_NETNS: &str = "/proc/thread-self/ns/net";

/// Name of the loopback device present in every network namespace.
pub const LOOPBACK_DEVICE: &str = "lo";

/// Address reported for the loopback device in plugin results.
pub const LOOPBACK_IPV4_CIDR: &str = "127.0.0.1/8";

/// Plugin protocol version used when the network configuration does not
/// name one.
pub const DEFAULT_CNI_VERSION: &str = "1.0.0";

/// Plugin protocol versions this plugin can speak.
pub const SUPPORTED_CNI_VERSIONS: &[&str] = &["0.3.0", "0.3.1", "0.4.0", "1.0.0"];

/// Binary name of the plugin.
pub const BIN_NAME: &str = "loopback";

/// Environment variable consulted for the log filter when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "NSLOOP_LOG";

/// Environment variable selecting the log format; `json` for structured output.
pub const LOG_FORMAT_ENV: &str = "NSLOOP_LOG_FORMAT";

/// Returns the namespace path of a process.
#[must_use]
pub fn pid_netns_path(pid: u32) -> String {
    format!("/proc/{pid}/ns/net")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_netns_path_points_into_proc() {
        assert_eq!(pid_netns_path(1), "/proc/1/ns/net");
    }

    #[test]
    fn default_version_is_supported() {
        assert!(SUPPORTED_CNI_VERSIONS.contains(&DEFAULT_CNI_VERSION));
    }
}
