//! Domain primitive types used across the nsloop workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a network namespace: the inode of its nsfs object.
///
/// Two handles refer to the same namespace exactly when their identities
/// are equal, whatever paths they were opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceId(u64);

impl NamespaceId {
    /// Wraps a raw inode number.
    #[must_use]
    pub const fn new(inode: u64) -> Self {
        Self(inode)
    }

    /// Returns the raw inode number.
    #[must_use]
    pub const fn inode(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net:[{}]", self.0)
    }
}

/// Administrative state of a network device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// `IFF_UP` is set.
    Up,
    /// `IFF_UP` is clear.
    Down,
}

impl LinkState {
    /// Returns `true` for [`LinkState::Up`].
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_id_displays_like_proc_symlink() {
        assert_eq!(NamespaceId::new(4_026_531_840).to_string(), "net:[4026531840]");
    }

    #[test]
    fn namespace_id_serializes_as_bare_inode() {
        let json = serde_json::to_string(&NamespaceId::new(42)).unwrap_or_default();
        assert_eq!(json, "42");
    }

    #[test]
    fn link_state_reports_up() {
        assert!(LinkState::Up.is_up());
        assert!(!LinkState::Down.is_up());
        assert_eq!(LinkState::Down.to_string(), "down");
    }
}
