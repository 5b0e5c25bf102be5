//! Caller-supplied write options.
//!
//! Everything here is a plain value type and (de)serializes with serde so it can be
//! embedded in an application's own config file, e.g.
//!
//! ```json
//! { "strategy": "no_clobber", "durability": "data_only", "preserve": { "permissions": true } }
//! ```

use serde::{Deserialize, Serialize};

/// Destination-exists policy applied at the publish instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Atomically replace whatever is at the destination.
    #[default]
    ReplaceExisting,
    /// Fail with `DestinationExists` if the destination exists when the rename happens.
    NoClobber,
}

/// How strongly the written content must survive a crash or power loss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// File data and metadata forced to storage, then the parent directory after publish.
    #[default]
    Full,
    /// File data forced to storage; no directory sync.
    DataOnly,
    /// No explicit sync, rely on OS write-back.
    None,
}

impl Durability {
    pub fn syncs_file(&self) -> bool { !matches!(self, Durability::None) }

    pub fn syncs_directory(&self) -> bool { matches!(self, Durability::Full) }
}

/// How a direct (non-atomic) write opens its destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectMode {
    /// Create the destination or truncate it if present.
    #[default]
    Truncate,
    /// Fail with `DestinationExists` if the destination is already there.
    CreateNew,
}

/// Whether content goes through a temp file + rename or straight to the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CommitMode {
    #[default]
    Atomic,
    /// Writes in place. Offers no atomicity: a crash or a cancellation mid-write
    /// leaves the destination partially written.
    Direct {
        #[serde(default)]
        mode: DirectMode,
    },
}

/// Attributes copied from a pre-existing destination onto the new content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Preserve {
    pub permissions: bool,
    /// Best effort: an unprivileged `chown` refusal is logged and ignored.
    pub ownership: bool,
    /// Like `ownership`, but any failure aborts the write.
    pub strict_ownership: bool,
    pub timestamps: bool,
    pub extended_attributes: bool,
    pub acls: bool,
}

impl Preserve {
    /// Every attribute, ownership in its best-effort form.
    pub fn all() -> Self {
        Self {
            permissions: true,
            ownership: true,
            strict_ownership: false,
            timestamps: true,
            extended_attributes: true,
            acls: true,
        }
    }

    pub fn any(&self) -> bool {
        self.permissions
            || self.wants_ownership()
            || self.timestamps
            || self.extended_attributes
            || self.acls
    }

    pub fn wants_ownership(&self) -> bool { self.ownership || self.strict_ownership }

    pub fn wants_xattrs(&self) -> bool { self.extended_attributes || self.acls }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub strategy: Strategy,
    pub durability: Durability,
    pub preserve: Preserve,
    /// Create missing parent directories before writing.
    pub create_intermediates: bool,
    pub commit: CommitMode,
}

impl Options {
    pub fn new() -> Self { Self::default() }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_preserve(mut self, preserve: Preserve) -> Self {
        self.preserve = preserve;
        self
    }

    pub fn create_intermediates(mut self, yes: bool) -> Self {
        self.create_intermediates = yes;
        self
    }

    /// Write in place instead of through a temp file. `Strategy::NoClobber` still
    /// applies: it opens the destination with `DirectMode::CreateNew` whatever `mode` says.
    pub fn direct(mut self, mode: DirectMode) -> Self {
        self.commit = CommitMode::Direct { mode };
        self
    }

    pub fn is_atomic(&self) -> bool { matches!(self.commit, CommitMode::Atomic) }
}
