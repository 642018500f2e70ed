//! Loopback device control.
//!
//! Reads and writes the administrative `IFF_UP` flag of a device in the
//! network namespace the calling thread is currently in. A fresh control
//! socket is opened on every call, because a socket stays bound to the
//! namespace it was created in.

use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use nix::sys::socket::{AddressFamily, SockFlag, SockType, socket};
use nsloop_common::constants::LOOPBACK_DEVICE;
use nsloop_common::error::{NsloopError, Result};
use nsloop_common::types::LinkState;

#[allow(clippy::cast_possible_truncation)]
const IFF_UP: libc::c_short = libc::IFF_UP as libc::c_short;

/// Toggles the UP flag of the loopback device in the active namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackConfigurer {
    device: String,
}

impl Default for LoopbackConfigurer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackConfigurer {
    /// Targets the `lo` device.
    #[must_use]
    pub fn new() -> Self {
        Self {
            device: LOOPBACK_DEVICE.to_string(),
        }
    }

    /// Targets an arbitrary device by name.
    #[must_use]
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    /// Returns the device name this configurer operates on.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Brings the device up. Succeeds without change if it is already up.
    ///
    /// # Errors
    ///
    /// Returns [`NsloopError::DeviceNotFound`] if the device does not exist
    /// in the current namespace, or [`NsloopError::PermissionDenied`] without
    /// `CAP_NET_ADMIN`.
    pub fn set_up(&self) -> Result<()> {
        self.set_state(LinkState::Up)
    }

    /// Takes the device down. Succeeds without change if it is already down.
    ///
    /// # Errors
    ///
    /// Same as [`LoopbackConfigurer::set_up`].
    pub fn set_down(&self) -> Result<()> {
        self.set_state(LinkState::Down)
    }

    /// Returns the current administrative state of the device.
    ///
    /// # Errors
    ///
    /// Returns [`NsloopError::DeviceNotFound`] if the device does not exist.
    #[allow(unsafe_code)]
    pub fn state(&self) -> Result<LinkState> {
        let sock = control_socket()?;
        let req = self.read_flags(&sock)?;
        // SAFETY: SIOCGIFFLAGS filled the `ifru_flags` member of the union.
        let flags = unsafe { req.ifr_ifru.ifru_flags };
        Ok(if flags & IFF_UP == 0 {
            LinkState::Down
        } else {
            LinkState::Up
        })
    }

    /// Sets the administrative state of the device.
    ///
    /// Only `IFF_UP` is changed; all other flags are written back as read.
    ///
    /// # Errors
    ///
    /// Same as [`LoopbackConfigurer::set_up`].
    #[allow(unsafe_code)]
    pub fn set_state(&self, desired: LinkState) -> Result<()> {
        let sock = control_socket()?;
        let mut req = self.read_flags(&sock)?;
        // SAFETY: SIOCGIFFLAGS filled the `ifru_flags` member of the union.
        let flags = unsafe { req.ifr_ifru.ifru_flags };

        if (flags & IFF_UP != 0) == desired.is_up() {
            tracing::debug!(device = %self.device, state = %desired, "device already in requested state");
            return Ok(());
        }

        req.ifr_ifru.ifru_flags = match desired {
            LinkState::Up => flags | IFF_UP,
            LinkState::Down => flags & !IFF_UP,
        };

        // SAFETY: `req` is a valid, initialised ifreq naming the device, and
        // SIOCSIFFLAGS only reads from it.
        let rc = unsafe {
            libc::ioctl(sock.as_raw_fd(), libc::SIOCSIFFLAGS as _, &raw mut req)
        };
        if rc < 0 {
            return Err(self.ioctl_error("SIOCSIFFLAGS", Errno::last()));
        }

        tracing::info!(device = %self.device, state = %desired, "set device state");
        Ok(())
    }

    #[allow(unsafe_code)]
    fn read_flags(&self, sock: &OwnedFd) -> Result<libc::ifreq> {
        let mut req = self.ifreq()?;
        // SAFETY: `req` is a valid ifreq naming the device; SIOCGIFFLAGS
        // writes only the flags member.
        let rc = unsafe {
            libc::ioctl(sock.as_raw_fd(), libc::SIOCGIFFLAGS as _, &raw mut req)
        };
        if rc < 0 {
            return Err(self.ioctl_error("SIOCGIFFLAGS", Errno::last()));
        }
        Ok(req)
    }

    #[allow(unsafe_code)]
    fn ifreq(&self) -> Result<libc::ifreq> {
        let name = self.device.as_bytes();
        if name.is_empty() || name.len() >= libc::IFNAMSIZ || name.contains(&0) {
            return Err(NsloopError::Config {
                message: format!("invalid device name: {:?}", self.device),
            });
        }

        // SAFETY: ifreq is a plain C struct for which all-zero bytes is a
        // valid value.
        let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
        for (dst, src) in req.ifr_name.iter_mut().zip(name) {
            *dst = libc::c_char::from_ne_bytes([*src]);
        }
        Ok(req)
    }

    fn ioctl_error(&self, op: &str, errno: Errno) -> NsloopError {
        match errno {
            Errno::ENODEV => NsloopError::DeviceNotFound {
                device: self.device.clone(),
            },
            Errno::EPERM | Errno::EACCES => NsloopError::PermissionDenied {
                message: format!("{op} on {}: {errno}", self.device),
            },
            _ => NsloopError::Io {
                path: format!("{op} {}", self.device).into(),
                source: errno.into(),
            },
        }
    }
}

fn control_socket() -> Result<OwnedFd> {
    socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_CLOEXEC,
        None,
    )
    .map_err(|e| NsloopError::Io {
        path: "socket(AF_INET, SOCK_DGRAM)".into(),
        source: e.into(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_targets_lo() {
        assert_eq!(LoopbackConfigurer::default().device(), "lo");
    }

    #[test]
    fn overlong_device_name_is_rejected() {
        let cfg = LoopbackConfigurer::for_device("a-device-name-too-long");
        assert!(matches!(cfg.state(), Err(NsloopError::Config { .. })));
    }

    #[test]
    fn empty_device_name_is_rejected() {
        let cfg = LoopbackConfigurer::for_device("");
        assert!(matches!(cfg.set_up(), Err(NsloopError::Config { .. })));
    }

    #[test]
    fn host_loopback_state_is_readable() {
        // Reading flags needs no privilege; lo exists in every namespace.
        assert!(LoopbackConfigurer::new().state().is_ok());
    }

    #[test]
    fn missing_device_is_reported() {
        let cfg = LoopbackConfigurer::for_device("nsloopnodev0");
        let err = cfg.state().unwrap_err();
        assert!(
            matches!(err, NsloopError::DeviceNotFound { ref device } if device == "nsloopnodev0"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn setting_current_state_is_a_noop() {
        // Idempotent requests never reach SIOCSIFFLAGS, so they succeed
        // without CAP_NET_ADMIN.
        let cfg = LoopbackConfigurer::new();
        let state = cfg.state().unwrap();
        cfg.set_state(state).unwrap();
        assert_eq!(cfg.state().unwrap(), state);
    }
}
