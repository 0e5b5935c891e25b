// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child reconciliation: positional diff of new elements against the previous render's fibers.
//!
//! Children are matched by position only, never by identity. Inserting at the head of a list
//! therefore rewrites every following position in place instead of shifting nodes.

use tracing::trace;

use crate::element::Element;
use crate::engine::Engine;
use crate::fiber::{Fiber, Source};
use crate::host::HostAdapter;
use crate::types::{EditTag, FiberId};

impl<H: HostAdapter> Engine<H> {
    /// Build the child chain of `parent` from `elements`, diffing against its alternate.
    ///
    /// At each position:
    /// - same kind on both sides: an `Update` fiber reusing the old host node;
    /// - a new element otherwise: a `Placement` fiber with no host node yet;
    /// - an old fiber not reused: tagged `Deletion` and queued for commit.
    pub(crate) fn reconcile_children(&mut self, parent: FiberId, elements: &[Element]) {
        let mut old = self
            .fibers
            .fiber(parent)
            .alternate
            .and_then(|alt| self.fibers.fiber(alt).child);
        let mut prev: Option<FiberId> = None;
        let mut index = 0;

        while index < elements.len() || old.is_some() {
            let element = elements.get(index);
            let same_kind = match (element, old) {
                (Some(e), Some(o)) => self.fibers.fiber(o).source.kind() == Some(e.kind()),
                _ => false,
            };

            let produced = match (element, old) {
                (Some(element), Some(old_id)) if same_kind => {
                    let mut fiber = Fiber::new(Source::Element(element.clone()), Some(parent));
                    fiber.host = self.fibers.fiber(old_id).host.clone();
                    fiber.alternate = Some(old_id);
                    fiber.tag = EditTag::Update;
                    Some(self.fibers.insert(fiber))
                }
                (Some(element), _) => {
                    let mut fiber = Fiber::new(Source::Element(element.clone()), Some(parent));
                    fiber.tag = EditTag::Placement;
                    Some(self.fibers.insert(fiber))
                }
                (None, _) => None,
            };

            if let Some(old_id) = old {
                if !same_kind {
                    self.fibers.fiber_mut(old_id).tag = EditTag::Deletion;
                    self.deletions.push(old_id);
                }
                old = self.fibers.fiber(old_id).sibling;
            }

            if let Some(new_id) = produced {
                trace!(?parent, index, fiber = ?new_id, tag = ?self.fibers.fiber(new_id).tag, "reconciled child");
                match prev {
                    None => self.fibers.fiber_mut(parent).child = Some(new_id),
                    Some(p) => self.fibers.fiber_mut(p).sibling = Some(new_id),
                }
                prev = Some(new_id);
            }
            index += 1;
        }
    }
}
