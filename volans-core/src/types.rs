//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the current process ID
    #[must_use]
    pub fn current() -> Self {
        #[allow(clippy::cast_possible_wrap)]
        Self(std::process::id() as i32)
    }

    /// Convert to `nix::unistd::Pid`
    #[must_use]
    pub const fn as_nix_pid(self) -> nix::unistd::Pid {
        nix::unistd::Pid::from_raw(self.0)
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProcessId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(Self(pid)),
            _ => Err(Error::parse(format!("not a process id: {s:?}"))),
        }
    }
}

impl From<nix::unistd::Pid> for ProcessId {
    fn from(pid: nix::unistd::Pid) -> Self {
        Self(pid.as_raw())
    }
}

impl From<ProcessId> for nix::unistd::Pid {
    fn from(pid: ProcessId) -> Self {
        nix::unistd::Pid::from_raw(pid.0)
    }
}

/// Kind of Linux namespace, named as under `/proc/<pid>/ns/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    /// Network namespace
    Net,
    /// PID namespace
    Pid,
    /// Mount namespace
    Mnt,
    /// UTS namespace (hostname)
    Uts,
    /// IPC namespace
    Ipc,
    /// User namespace
    User,
    /// Cgroup namespace
    Cgroup,
}

impl NamespaceKind {
    /// Every kind the kernel exposes a link for
    pub const ALL: [Self; 7] = [
        Self::Net,
        Self::Pid,
        Self::Mnt,
        Self::Uts,
        Self::Ipc,
        Self::User,
        Self::Cgroup,
    ];

    /// Name of the link file under `/proc/<pid>/ns/`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Net => "net",
            Self::Pid => "pid",
            Self::Mnt => "mnt",
            Self::Uts => "uts",
            Self::Ipc => "ipc",
            Self::User => "user",
            Self::Cgroup => "cgroup",
        }
    }

    /// Matching `CLONE_NEW*` flag for setns(2)
    #[must_use]
    pub const fn clone_flag(self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;
        match self {
            Self::Net => CloneFlags::CLONE_NEWNET,
            Self::Pid => CloneFlags::CLONE_NEWPID,
            Self::Mnt => CloneFlags::CLONE_NEWNS,
            Self::Uts => CloneFlags::CLONE_NEWUTS,
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
            Self::User => CloneFlags::CLONE_NEWUSER,
            Self::Cgroup => CloneFlags::CLONE_NEWCGROUP,
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for NamespaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::parse(format!("unknown namespace kind: {s:?}")))
    }
}

/// Identity of a namespace instance: the inode number behind its link
///
/// Stable for the namespace's lifetime and shared by all member processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct NamespaceId(u64);

impl NamespaceId {
    /// Create from a raw inode number
    #[must_use]
    pub const fn from_inode(inode: u64) -> Self {
        Self(inode)
    }

    /// Get the inode number
    #[must_use]
    pub const fn inode(self) -> u64 {
        self.0
    }

    /// Parse the kernel link text, e.g. `net:[4026531840]`
    ///
    /// Returns the kind named in the link together with the identity.
    ///
    /// # Errors
    /// Returns error if the text is not in `<kind>:[<inode>]` form
    pub fn parse_link(link: &str) -> Result<(NamespaceKind, Self)> {
        let malformed = || Error::parse(format!("malformed namespace link: {link:?}"));

        let (kind, rest) = link.split_once(':').ok_or_else(malformed)?;
        let inode = rest
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(malformed)?
            .parse::<u64>()
            .map_err(|_| malformed())?;

        Ok((kind.parse()?, Self(inode)))
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for NamespaceId {
    type Err = Error;

    /// Accepts either the bare inode (`4026531840`) or the link text
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(inode) = s.parse::<u64>() {
            return Ok(Self(inode));
        }
        Self::parse_link(s).map(|(_, id)| id)
    }
}

/// CPU affinity mask as the kernel prints it in `Cpus_allowed:`
///
/// Words are kept in printed order (most significant first), 32 bits each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuAffinity(Vec<u32>);

impl CpuAffinity {
    /// Create from mask words in printed order
    #[must_use]
    pub fn from_words(words: Vec<u32>) -> Self {
        Self(words)
    }

    /// Mask words in printed order
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.0
    }

    /// Space-separated binary rendering of each word, e.g. `1111 11111111`
    #[must_use]
    pub fn to_binary_string(&self) -> String {
        self.0
            .iter()
            .map(|w| format!("{w:b}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of CPUs set in the mask
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }
}

impl fmt::Display for CpuAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.0.iter().map(|w| format!("{w:08x}")).collect();
        f.write_str(&words.join(","))
    }
}

impl FromStr for CpuAffinity {
    type Err = Error;

    /// Parses the `Cpus_allowed:` value, e.g. `ffffffff,ffffffff`
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .split(',')
            .map(|word| {
                u32::from_str_radix(word, 16)
                    .map_err(|_| Error::parse(format!("bad affinity word: {word:?}")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}
