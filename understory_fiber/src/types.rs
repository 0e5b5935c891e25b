// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the fiber tree: fiber identifiers, edit tags, and edit summaries.

/// Identifier for a fiber in the engine's arena.
///
/// This is a small, copyable handle. It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - A fiber lives for exactly one render pass: it is allocated when the scheduler first
///   visits its tree position and freed once a later commit replaces the tree it belongs to
///   (or when an in-flight render is abandoned).
/// - Freed slots are reused with an incremented generation, so a stale `FiberId` never
///   aliases a different live fiber.
///
/// Use [`Engine::fiber`](crate::Engine::fiber) to inspect a fiber; it returns `None` for stale ids.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FiberId(pub(crate) u32, pub(crate) u32);

impl FiberId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// The host mutation a fiber requires at commit time.
///
/// Set by the reconciler, consumed (and reset to [`EditTag::None`]) by the commit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum EditTag {
    /// No host mutation; used for root containers and after commit.
    #[default]
    None,
    /// Attach the fiber's freshly created host node under its nearest host ancestor.
    Placement,
    /// Reuse the previous render's host node and patch its properties.
    Update,
    /// Detach the host node; only ever set on fibers of the current (committed) tree.
    Deletion,
}

bitflags::bitflags! {
    /// Summary of which kinds of edits a commit applied.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EditKinds: u8 {
        /// At least one host node was attached.
        const PLACEMENT = 0b0000_0001;
        /// At least one reused host node had its properties patched.
        const UPDATE    = 0b0000_0010;
        /// At least one host node was detached.
        const DELETION  = 0b0000_0100;
    }
}

impl Default for EditKinds {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<EditTag> for EditKinds {
    fn from(tag: EditTag) -> Self {
        match tag {
            EditTag::None => Self::empty(),
            EditTag::Placement => Self::PLACEMENT,
            EditTag::Update => Self::UPDATE,
            EditTag::Deletion => Self::DELETION,
        }
    }
}
