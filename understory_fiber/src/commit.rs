// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit: apply a finished render to the host tree in one uninterrupted pass.
//!
//! Every host mutation a commit makes is journaled. If a host call fails partway, the journal
//! becomes a rollback plan that restores the host tree to what the committed fiber tree
//! describes; [`Engine::run_work_unit`] runs it before the next render starts.

use alloc::vec::Vec;
use tracing::{debug, trace, warn};

use crate::engine::Engine;
use crate::error::RenderError;
use crate::host::{HostAdapter, apply_patch};
use crate::props::{self, PropPatch};
use crate::types::{EditKinds, EditTag, FiberId};

/// Summary of the host edits applied by [`Engine::commit`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Host nodes attached.
    pub placements: usize,
    /// Fibers that reused a host node (whether or not any property changed).
    pub updates: usize,
    /// Fibers of the previous tree dropped.
    pub deletions: usize,
    /// Host nodes detached while processing deletions.
    pub removed_nodes: usize,
    /// Property and handler calls made on reused nodes.
    pub patches: usize,
    /// Which kinds of host mutation occurred.
    pub edits: EditKinds,
}

impl CommitReport {
    /// True if the commit did not mutate the host tree.
    pub fn is_empty(&self) -> bool {
        self.placements == 0 && self.removed_nodes == 0 && self.patches == 0
    }
}

/// One host call that reverses part of a failed commit.
#[derive(Clone, Debug)]
pub(crate) enum Undo<N> {
    Remove { parent: N, node: N },
    Append { parent: N, node: N },
    Patch { node: N, patch: PropPatch },
}

impl<H: HostAdapter> Engine<H> {
    /// Apply the finished render to the host tree and promote it to current.
    ///
    /// Deletions are applied first, then a pre-order walk of the new tree attaches placed nodes
    /// and patches updated ones. Runs to completion without yielding.
    ///
    /// With no render in flight this is a no-op returning an empty report. A host fault stops
    /// the commit, leaves `current` untouched, and poisons the render until the next
    /// [`Engine::schedule_render`]. The host calls already made are undone at the start of
    /// the next [`Engine::run_work_unit`].
    pub fn commit(&mut self) -> Result<CommitReport, RenderError<H::Error>> {
        let Some(root) = self.wip else {
            trace!("commit with no render in flight");
            return Ok(CommitReport::default());
        };
        if self.poisoned {
            return Err(RenderError::Poisoned);
        }
        if self.next_unit.is_some() {
            return Err(RenderError::RenderInProgress);
        }

        // Cleared only once every edit has been applied.
        self.poisoned = true;
        self.journal.clear();
        self.detached.clear();
        let report = match self.apply_edits(root) {
            Ok(report) => report,
            Err(err) => {
                self.plan_rollback();
                return Err(err);
            }
        };

        self.finish_commit(root);
        debug!(
            placements = report.placements,
            updates = report.updates,
            deletions = report.deletions,
            patches = report.patches,
            "render committed"
        );
        Ok(report)
    }

    fn apply_edits(&mut self, root: FiberId) -> Result<CommitReport, RenderError<H::Error>> {
        let mut report = CommitReport::default();
        for i in 0..self.deletions.len() {
            let id = self.deletions[i];
            report.removed_nodes += self.commit_deletion(id)?;
            report.deletions += 1;
            report.edits |= EditKinds::DELETION;
        }

        let mut cursor = self.fibers.fiber(root).child;
        while let Some(id) = cursor {
            self.commit_work(id, &mut report)?;
            cursor = self.next_after(id);
        }
        Ok(report)
    }

    fn commit_work(
        &mut self,
        id: FiberId,
        report: &mut CommitReport,
    ) -> Result<(), RenderError<H::Error>> {
        let fiber = self.fibers.fiber(id);
        match fiber.tag {
            EditTag::Placement => {
                let node = fiber.host.clone();
                let parent = self.host_parent(id);
                if let (Some(node), Some((_, parent))) = (node, parent) {
                    trace!(?id, ?node, ?parent, "append placed node");
                    self.host.append_child(&parent, &node)?;
                    self.journal.push(Undo::Remove { parent, node });
                    report.placements += 1;
                    report.edits |= EditKinds::PLACEMENT;
                } else {
                    warn!(?id, "placed fiber without a host node or host ancestor");
                }
            }
            EditTag::Update => {
                report.updates += 1;
                let (Some(old), Some(new), Some(node)) = (
                    fiber
                        .alternate
                        .and_then(|alt| self.fibers.fiber(alt).source.props()),
                    fiber.source.props(),
                    fiber.host.clone(),
                ) else {
                    return Ok(());
                };
                for patch in props::diff(old, new) {
                    apply_patch(&mut self.host, &node, &patch)?;
                    self.journal.push(Undo::Patch {
                        node: node.clone(),
                        patch: props::invert(&patch, old),
                    });
                    report.patches += 1;
                    report.edits |= EditKinds::UPDATE;
                }
            }
            EditTag::Deletion => {
                warn!(?id, "deletion tag found in the new tree");
            }
            EditTag::None => {}
        }
        Ok(())
    }

    /// Detach the host nodes owned by a deleted fiber. Returns the number of nodes removed.
    ///
    /// A fiber without a host node has its children's nodes removed instead, so the whole
    /// subtree is always detached.
    fn commit_deletion(&mut self, id: FiberId) -> Result<usize, RenderError<H::Error>> {
        let Some((owner, parent)) = self.host_parent(id) else {
            warn!(?id, "deleted fiber has no host ancestor");
            return Ok(0);
        };
        let mut removed = 0;
        let mut stack = Vec::from([id]);
        while let Some(cur) = stack.pop() {
            let fiber = self.fibers.fiber(cur);
            if let Some(node) = fiber.host.clone() {
                trace!(fiber = ?cur, ?node, "remove deleted node");
                self.host.remove_child(&parent, &node)?;
                self.detached.push((owner, cur));
                removed += 1;
                continue;
            }
            let mut children = Vec::new();
            let mut child = fiber.child;
            while let Some(c) = child {
                children.push(c);
                child = self.fibers.fiber(c).sibling;
            }
            stack.extend(children.into_iter().rev());
        }
        Ok(removed)
    }

    /// Nearest ancestor that owns a host node, with that node.
    fn host_parent(&self, id: FiberId) -> Option<(FiberId, H::Node)> {
        let mut cursor = self.fibers.fiber(id).parent;
        while let Some(p) = cursor {
            let fiber = self.fibers.fiber(p);
            if let Some(node) = &fiber.host {
                return Some((p, node.clone()));
            }
            cursor = fiber.parent;
        }
        None
    }

    /// Host-owning fibers directly below `id`, in order, looking through fibers without a node.
    fn host_children(&self, id: FiberId) -> Vec<(FiberId, H::Node)> {
        let mut out = Vec::new();
        let mut stack = Vec::from([self.fibers.fiber(id).child]);
        while let Some(top) = stack.last_mut() {
            let Some(cur) = *top else {
                stack.pop();
                continue;
            };
            let fiber = self.fibers.fiber(cur);
            *top = fiber.sibling;
            match &fiber.host {
                Some(node) => out.push((cur, node.clone())),
                None => stack.push(fiber.child),
            }
        }
        out
    }

    /// Turn the journal of a failed commit into rollback steps.
    ///
    /// Appends and patches are reversed in the opposite order they were made. Removed nodes
    /// cannot be put back in place with `append_child` alone, so every host parent that lost
    /// a child has its committed children detached and appended again in order.
    fn plan_rollback(&mut self) {
        let mut steps: Vec<Undo<H::Node>> = self.journal.drain(..).rev().collect();

        let mut owners: Vec<FiberId> = Vec::new();
        for (owner, _) in &self.detached {
            if !owners.contains(owner) {
                owners.push(*owner);
            }
        }
        for owner in owners {
            let Some(parent) = self.fibers.fiber(owner).host.clone() else {
                continue;
            };
            let children = self.host_children(owner);
            for (id, node) in &children {
                if !self.detached.contains(&(owner, *id)) {
                    steps.push(Undo::Remove {
                        parent: parent.clone(),
                        node: node.clone(),
                    });
                }
            }
            steps.extend(children.into_iter().map(|(_, node)| Undo::Append {
                parent: parent.clone(),
                node,
            }));
        }
        self.detached.clear();

        debug!(steps = steps.len(), "commit failed; rollback planned");
        steps.reverse();
        self.rollback = steps;
    }

    /// Run the rollback steps left by a failed commit. Each step is dropped once it succeeds.
    pub(crate) fn undo_failed_commit(&mut self) -> Result<(), RenderError<H::Error>> {
        if self.rollback.is_empty() {
            return Ok(());
        }
        trace!(steps = self.rollback.len(), "undoing failed commit");
        while let Some(step) = self.rollback.last() {
            match step {
                Undo::Remove { parent, node } => self.host.remove_child(parent, node)?,
                Undo::Append { parent, node } => self.host.append_child(parent, node)?,
                Undo::Patch { node, patch } => apply_patch(&mut self.host, node, patch)?,
            }
            self.rollback.pop();
        }
        debug!("failed commit undone");
        Ok(())
    }

    fn finish_commit(&mut self, root: FiberId) {
        self.deletions.clear();
        self.journal.clear();
        self.detached.clear();
        if let Some(old) = self.current.take() {
            let freed = self.fibers.free_subtree(old);
            trace!(freed, "freed previous tree");
        }
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            let fiber = self.fibers.fiber_mut(id);
            fiber.alternate = None;
            fiber.tag = EditTag::None;
            cursor = self.next_after(id);
        }
        self.current = Some(root);
        self.wip = None;
        self.poisoned = false;
        self.commits += 1;
    }
}
