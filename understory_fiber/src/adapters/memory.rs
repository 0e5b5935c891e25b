// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory host tree.
//!
//! [`MemoryHost`] keeps its nodes in a flat vector and records every mutation in an operation
//! log, which makes it suitable for asserting exactly which host calls a render produced. It
//! also counts continuation requests and can inject a fault after a fixed number of calls.
//!
//! [`Snapshot`] captures a host subtree (or an element tree, via [`Snapshot::of_element`]) in a
//! comparable form. Its `Display` output is compact markup:
//!
//! ```
//! use understory_fiber::adapters::memory::Snapshot;
//! use understory_fiber::Element;
//!
//! let e = Element::builder("p").prop("id", "x").text("hi").build().unwrap();
//! assert_eq!(Snapshot::of_element(&e).to_string(), r#"<p id="x">hi</p>"#);
//! ```

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use thiserror::Error;

use crate::element::{Element, ElementKind, TEXT_VALUE};
use crate::host::HostAdapter;
use crate::props::{Handler, PropValue, event_name};

/// Handle to a node owned by a [`MemoryHost`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HostNodeId(u32);

impl HostNodeId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// One recorded host call.
#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    /// A node was created.
    Create {
        /// The new node.
        node: HostNodeId,
        /// Its kind.
        kind: ElementKind,
    },
    /// `child` was appended to `parent`.
    Append {
        /// Receiving node.
        parent: HostNodeId,
        /// Appended node.
        child: HostNodeId,
    },
    /// `child` was detached from `parent`.
    Remove {
        /// Former parent.
        parent: HostNodeId,
        /// Detached node.
        child: HostNodeId,
    },
    /// A plain property was written.
    Set {
        /// Target node.
        node: HostNodeId,
        /// Property name.
        name: String,
        /// Written value.
        value: PropValue,
    },
    /// A plain property was cleared.
    Clear {
        /// Target node.
        node: HostNodeId,
        /// Property name.
        name: String,
    },
    /// A handler was registered.
    AddHandler {
        /// Target node.
        node: HostNodeId,
        /// Event name.
        event: String,
        /// Registered handler.
        handler: Handler,
    },
    /// A handler was unregistered.
    RemoveHandler {
        /// Target node.
        node: HostNodeId,
        /// Event name.
        event: String,
        /// Unregistered handler.
        handler: Handler,
    },
}

impl HostOp {
    /// The node the call acted on; for `Append` and `Remove`, the child.
    pub fn node(&self) -> HostNodeId {
        match self {
            Self::Append { child, .. } | Self::Remove { child, .. } => *child,
            Self::Create { node, .. }
            | Self::Set { node, .. }
            | Self::Clear { node, .. }
            | Self::AddHandler { node, .. }
            | Self::RemoveHandler { node, .. } => *node,
        }
    }
}

/// Faults reported by [`MemoryHost`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MemoryHostError {
    /// The handle does not belong to this host.
    #[error("unknown host node {0:?}")]
    UnknownNode(HostNodeId),
    /// The node being appended already has a parent.
    #[error("host node {0:?} is already attached")]
    AlreadyAttached(HostNodeId),
    /// The node being removed is not a child of the given parent.
    #[error("host node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Given parent.
        parent: HostNodeId,
        /// Given child.
        child: HostNodeId,
    },
    /// No such handler is registered for the event.
    #[error("no matching `{event}` handler on host node {node:?}")]
    HandlerNotRegistered {
        /// Target node.
        node: HostNodeId,
        /// Event name.
        event: String,
    },
    /// A fault armed with [`MemoryHost::fail_after`].
    #[error("injected host fault")]
    Injected,
}

#[derive(Debug, Default)]
struct HostNode {
    /// `None` for containers.
    kind: Option<ElementKind>,
    parent: Option<HostNodeId>,
    children: Vec<HostNodeId>,
    props: BTreeMap<String, PropValue>,
    handlers: Vec<(String, Handler)>,
}

/// A host tree held in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<HostNode>,
    ops: Vec<HostOp>,
    continuations: usize,
    fail_after: Option<usize>,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container node to render into. Not recorded in the operation log.
    pub fn create_container(&mut self) -> HostNodeId {
        self.push(None)
    }

    /// Let `calls` more mutating calls succeed, then fail every call until cleared.
    pub fn fail_after(&mut self, calls: usize) {
        self.fail_after = Some(calls);
    }

    /// Disarm a fault set with [`MemoryHost::fail_after`].
    pub fn clear_failure(&mut self) {
        self.fail_after = None;
    }

    /// Every successful mutating call, in order.
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drain the operation log.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        core::mem::take(&mut self.ops)
    }

    /// Empty the operation log.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of [`HostAdapter::schedule_continuation`] calls received.
    pub fn continuation_requests(&self) -> usize {
        self.continuations
    }

    /// Number of nodes ever created, containers included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children of `node`, in order. Empty for unknown handles.
    pub fn children(&self, node: HostNodeId) -> &[HostNodeId] {
        self.nodes
            .get(node.idx())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Parent of `node`, if attached.
    pub fn parent(&self, node: HostNodeId) -> Option<HostNodeId> {
        self.nodes.get(node.idx())?.parent
    }

    /// Kind of `node`; `None` for containers and unknown handles.
    pub fn kind(&self, node: HostNodeId) -> Option<&ElementKind> {
        self.nodes.get(node.idx())?.kind.as_ref()
    }

    /// Current value of a plain property.
    pub fn property(&self, node: HostNodeId, name: &str) -> Option<&PropValue> {
        self.nodes.get(node.idx())?.props.get(name)
    }

    /// Registered handlers of `node`, in registration order.
    pub fn handlers(&self, node: HostNodeId) -> impl Iterator<Item = (&str, &Handler)> + '_ {
        self.nodes
            .get(node.idx())
            .into_iter()
            .flat_map(|n| n.handlers.iter().map(|(e, h)| (e.as_str(), h)))
    }

    /// Fire `event` on `node`, calling each registered handler with `payload`.
    ///
    /// Returns the number of handlers called. Events do not bubble.
    pub fn dispatch(&self, node: HostNodeId, event: &str, payload: &dyn Any) -> usize {
        let matching: Vec<Handler> = self
            .handlers(node)
            .filter(|(e, _)| *e == event)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in &matching {
            handler.call(payload);
        }
        matching.len()
    }

    /// Capture the subtree under `node`.
    pub fn snapshot(&self, node: HostNodeId) -> Snapshot {
        let Some(n) = self.nodes.get(node.idx()) else {
            return Snapshot::default();
        };
        let mut handlers: Vec<String> = n.handlers.iter().map(|(e, _)| e.clone()).collect();
        handlers.sort();
        Snapshot {
            kind: n.kind.clone(),
            props: n.props.clone(),
            handlers,
            children: n.children.iter().map(|c| self.snapshot(*c)).collect(),
        }
    }

    fn push(&mut self, kind: Option<ElementKind>) -> HostNodeId {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "HostNodeId uses 32-bit indices by design."
        )]
        let id = HostNodeId(self.nodes.len() as u32);
        self.nodes.push(HostNode {
            kind,
            ..HostNode::default()
        });
        id
    }

    fn node_mut(&mut self, node: HostNodeId) -> Result<&mut HostNode, MemoryHostError> {
        self.nodes
            .get_mut(node.idx())
            .ok_or(MemoryHostError::UnknownNode(node))
    }

    /// Count down an armed fault.
    fn tick(&mut self) -> Result<(), MemoryHostError> {
        match self.fail_after {
            Some(0) => Err(MemoryHostError::Injected),
            Some(n) => {
                self.fail_after = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl HostAdapter for MemoryHost {
    type Node = HostNodeId;
    type Error = MemoryHostError;

    fn create_node(&mut self, kind: &ElementKind) -> Result<HostNodeId, MemoryHostError> {
        self.tick()?;
        let node = self.push(Some(kind.clone()));
        self.ops.push(HostOp::Create {
            node,
            kind: kind.clone(),
        });
        Ok(node)
    }

    fn append_child(
        &mut self,
        parent: &HostNodeId,
        child: &HostNodeId,
    ) -> Result<(), MemoryHostError> {
        self.tick()?;
        let (parent, child) = (*parent, *child);
        self.node_mut(parent)?;
        let c = self.node_mut(child)?;
        if c.parent.is_some() {
            return Err(MemoryHostError::AlreadyAttached(child));
        }
        c.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.ops.push(HostOp::Append { parent, child });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: &HostNodeId,
        child: &HostNodeId,
    ) -> Result<(), MemoryHostError> {
        self.tick()?;
        let (parent, child) = (*parent, *child);
        let p = self.node_mut(parent)?;
        let Some(pos) = p.children.iter().position(|c| *c == child) else {
            return Err(MemoryHostError::NotAChild { parent, child });
        };
        p.children.remove(pos);
        self.node_mut(child)?.parent = None;
        self.ops.push(HostOp::Remove { parent, child });
        Ok(())
    }

    fn set_property(
        &mut self,
        node: &HostNodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), MemoryHostError> {
        self.tick()?;
        self.node_mut(*node)?
            .props
            .insert(name.into(), value.clone());
        self.ops.push(HostOp::Set {
            node: *node,
            name: name.into(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_property(&mut self, node: &HostNodeId, name: &str) -> Result<(), MemoryHostError> {
        self.tick()?;
        self.node_mut(*node)?.props.remove(name);
        self.ops.push(HostOp::Clear {
            node: *node,
            name: name.into(),
        });
        Ok(())
    }

    fn add_event_handler(
        &mut self,
        node: &HostNodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), MemoryHostError> {
        self.tick()?;
        self.node_mut(*node)?
            .handlers
            .push((event.into(), handler.clone()));
        self.ops.push(HostOp::AddHandler {
            node: *node,
            event: event.into(),
            handler: handler.clone(),
        });
        Ok(())
    }

    fn remove_event_handler(
        &mut self,
        node: &HostNodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), MemoryHostError> {
        self.tick()?;
        let n = self.node_mut(*node)?;
        let Some(pos) = n
            .handlers
            .iter()
            .position(|(e, h)| e == event && h.ptr_eq(handler))
        else {
            return Err(MemoryHostError::HandlerNotRegistered {
                node: *node,
                event: event.into(),
            });
        };
        n.handlers.remove(pos);
        self.ops.push(HostOp::RemoveHandler {
            node: *node,
            event: event.into(),
            handler: handler.clone(),
        });
        Ok(())
    }

    fn schedule_continuation(&mut self) {
        self.continuations += 1;
    }
}

/// A comparable capture of a host subtree.
///
/// Handlers are reduced to their sorted event names, since handler identity does not survive
/// rebuilding an element tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Node kind; `None` for a container.
    pub kind: Option<ElementKind>,
    /// Plain properties.
    pub props: BTreeMap<String, PropValue>,
    /// Registered event names, sorted.
    pub handlers: Vec<String>,
    /// Child captures, in order.
    pub children: Vec<Self>,
}

impl Snapshot {
    /// The snapshot a host should hold after rendering `element`.
    pub fn of_element(element: &Element) -> Self {
        let props = element
            .props()
            .plain()
            .map(|(k, v)| (String::from(k), v.clone()))
            .collect();
        let mut handlers: Vec<String> = element
            .props()
            .handlers()
            .filter_map(|(k, _)| event_name(k))
            .collect();
        handlers.sort();
        Self {
            kind: Some(element.kind().clone()),
            props,
            handlers,
            children: element.children().iter().map(Self::of_element).collect(),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            None => self.children.iter().try_for_each(|c| write!(f, "{c}")),
            Some(ElementKind::Text) => match self.props.get(TEXT_VALUE) {
                Some(value) => write!(f, "{value}"),
                None => Ok(()),
            },
            Some(ElementKind::Host(tag)) => {
                write!(f, "<{tag}")?;
                for (name, value) in &self.props {
                    write!(f, " {name}=\"{value}\"")?;
                }
                f.write_str(">")?;
                for child in &self.children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{tag}>")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn append_and_remove_track_parents() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        let a = host.create_node(&ElementKind::Host("a".into())).unwrap();
        host.append_child(&root, &a).unwrap();
        assert_eq!(host.children(root), [a]);
        assert_eq!(host.parent(a), Some(root));
        assert_eq!(
            host.append_child(&root, &a),
            Err(MemoryHostError::AlreadyAttached(a))
        );
        host.remove_child(&root, &a).unwrap();
        assert!(host.children(root).is_empty());
        assert_eq!(
            host.remove_child(&root, &a),
            Err(MemoryHostError::NotAChild {
                parent: root,
                child: a
            })
        );
    }

    #[test]
    fn containers_are_not_logged() {
        let mut host = MemoryHost::new();
        host.create_container();
        assert!(host.ops().is_empty(), "container creation is setup, not a host call");
        assert_eq!(host.node_count(), 1);
    }

    #[test]
    fn fault_fires_after_budget() {
        let mut host = MemoryHost::new();
        host.fail_after(1);
        let kind = ElementKind::Text;
        assert!(host.create_node(&kind).is_ok());
        assert_eq!(host.create_node(&kind), Err(MemoryHostError::Injected));
        assert_eq!(host.ops().len(), 1, "failed calls are not logged");
        host.clear_failure();
        assert!(host.create_node(&kind).is_ok());
    }

    #[test]
    fn handlers_are_removed_by_identity() {
        let mut host = MemoryHost::new();
        let n = host.create_node(&ElementKind::Host("b".into())).unwrap();
        let h1 = Handler::new(|_| {});
        let h2 = Handler::new(|_| {});
        host.add_event_handler(&n, "click", &h1).unwrap();
        assert!(matches!(
            host.remove_event_handler(&n, "click", &h2),
            Err(MemoryHostError::HandlerNotRegistered { .. })
        ));
        host.remove_event_handler(&n, "click", &h1).unwrap();
        assert_eq!(host.dispatch(n, "click", &()), 0);
    }

    #[test]
    fn snapshot_renders_markup() {
        let e = Element::builder("div")
            .prop("id", "foo")
            .child(Element::builder("b").text("bold").build().unwrap())
            .text(" tail")
            .build()
            .unwrap();
        assert_eq!(
            Snapshot::of_element(&e).to_string(),
            r#"<div id="foo"><b>bold</b> tail</div>"#
        );
    }
}
