// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host adapter: primitive operations on the real output tree.
//!
//! The engine only mutates the host tree through this trait. Node creation and the initial
//! property writes on a freshly created (still detached) node happen while the tree is being
//! built; attaching, detaching, and patching attached nodes happen only during commit.

use core::fmt::Debug;
use tracing::trace;

use crate::element::ElementKind;
use crate::props::{Handler, PropPatch, PropValue};

/// Primitive mutations on a host tree.
pub trait HostAdapter {
    /// Handle to a host node. Cloning a handle must not clone the node, and handles compare
    /// equal only if they refer to the same node.
    type Node: Clone + Debug + PartialEq;
    /// Failure reported by any host call.
    type Error: core::error::Error + 'static;

    /// Allocate a detached host node for `kind`.
    fn create_node(&mut self, kind: &ElementKind) -> Result<Self::Node, Self::Error>;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), Self::Error>;

    /// Detach `child` from `parent`, along with its host subtree.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), Self::Error>;

    /// Write a plain property.
    fn set_property(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &PropValue,
    ) -> Result<(), Self::Error>;

    /// Reset a plain property to its empty/default value.
    fn clear_property(&mut self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;

    /// Register `handler` for `event`.
    fn add_event_handler(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), Self::Error>;

    /// Unregister a previously registered `handler` for `event`.
    fn remove_event_handler(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), Self::Error>;

    /// Ask to be driven again on the next idle slot.
    ///
    /// The host is expected to call [`Engine::on_idle`](crate::Engine::on_idle) when the slot
    /// arrives. Hosts that drive the engine in a loop of their own can ignore this.
    fn schedule_continuation(&mut self) {}
}

/// Apply `patches` to `node` in order. Returns the number of host calls made.
pub(crate) fn apply_patches<H: HostAdapter>(
    host: &mut H,
    node: &H::Node,
    patches: &[PropPatch],
) -> Result<usize, H::Error> {
    for patch in patches {
        apply_patch(host, node, patch)?;
    }
    Ok(patches.len())
}

/// Apply a single patch to `node`.
pub(crate) fn apply_patch<H: HostAdapter>(
    host: &mut H,
    node: &H::Node,
    patch: &PropPatch,
) -> Result<(), H::Error> {
    trace!(?node, ?patch, "apply property patch");
    match patch {
        PropPatch::RemoveHandler { event, handler } => {
            host.remove_event_handler(node, event, handler)
        }
        PropPatch::Clear { name } => host.clear_property(node, name),
        PropPatch::Set { name, value } => host.set_property(node, name, value),
        PropPatch::AddHandler { event, handler } => host.add_event_handler(node, event, handler),
    }
}
