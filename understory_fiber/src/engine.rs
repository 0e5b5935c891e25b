// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine: owns the fiber trees and drives the interruptible render walk.
//!
//! ## Phases
//!
//! 1. [`Engine::schedule_render`] creates a fresh work-in-progress root.
//! 2. [`Engine::run_work_unit`] walks the tree one fiber at a time in pre-order, materializing
//!    host nodes and reconciling children, and yields when the [`Deadline`] runs out.
//! 3. [`Engine::commit`] applies every recorded edit to the host tree in one pass and promotes
//!    the work-in-progress tree to current.
//!
//! [`Engine::on_idle`] combines 2 and 3 for hosts that deliver idle slots.

use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;
use tracing::{debug, trace};

use crate::commit::Undo;
use crate::deadline::Deadline;
use crate::element::Element;
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberArena, FiberRef, Source};
use crate::host::{HostAdapter, apply_patches};
use crate::props::{self, Props};
use crate::types::{EditTag, FiberId};

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Yield once the deadline reports less than this much time remaining.
    ///
    /// Defaults to one millisecond.
    pub yield_threshold: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
        }
    }
}

/// Where the engine stands after a scheduling step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// Units of work remain; call [`Engine::run_work_unit`] again.
    Pending,
    /// The walk finished; the render is waiting for [`Engine::commit`].
    ReadyToCommit,
    /// Nothing to do until the next [`Engine::schedule_render`].
    ///
    /// Also reported for a render whose commit failed.
    Idle,
}

/// An incremental reconciliation engine bound to one host.
///
/// At most two fiber trees exist at a time: `current`, the last committed render, and the
/// work-in-progress tree being built. Only [`Engine::commit`] replaces `current`.
pub struct Engine<H: HostAdapter> {
    pub(crate) host: H,
    config: EngineConfig,
    pub(crate) fibers: FiberArena<H::Node>,
    pub(crate) current: Option<FiberId>,
    pub(crate) wip: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) poisoned: bool,
    pub(crate) commits: u64,
    /// Undo records for host mutations made by the commit in progress.
    pub(crate) journal: Vec<Undo<H::Node>>,
    /// `(host parent fiber, detached fiber)` pairs for nodes removed by the commit in progress.
    pub(crate) detached: Vec<(FiberId, FiberId)>,
    /// Steps restoring the host tree after a failed commit, next step last.
    pub(crate) rollback: Vec<Undo<H::Node>>,
}

impl<H: HostAdapter + fmt::Debug> fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("host", &self.host)
            .field("config", &self.config)
            .field("fibers", &self.fibers)
            .field("current", &self.current)
            .field("work_in_progress", &self.wip)
            .field("next_unit", &self.next_unit)
            .field("deletions", &self.deletions.len())
            .field("poisoned", &self.poisoned)
            .field("commits", &self.commits)
            .field("journal", &self.journal.len())
            .field("detached", &self.detached.len())
            .field("rollback", &self.rollback.len())
            .finish()
    }
}

impl<H: HostAdapter> Engine<H> {
    /// Create an engine with the default configuration.
    pub fn new(host: H) -> Self {
        Self::with_config(host, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(host: H, config: EngineConfig) -> Self {
        Self {
            host,
            config,
            fibers: FiberArena::new(),
            current: None,
            wip: None,
            next_unit: None,
            deletions: Vec::new(),
            poisoned: false,
            commits: 0,
            journal: Vec::new(),
            detached: Vec::new(),
            rollback: Vec::new(),
        }
    }

    /// The host adapter.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host adapter, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Consume the engine and return its host adapter.
    pub fn into_host(self) -> H {
        self.host
    }

    /// The active configuration.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Root of the last committed tree.
    pub fn current_root(&self) -> Option<FiberId> {
        self.current
    }

    /// Root of the in-flight render.
    pub fn work_in_progress_root(&self) -> Option<FiberId> {
        self.wip
    }

    /// The fiber the next unit of work will process.
    pub fn next_unit_of_work(&self) -> Option<FiberId> {
        self.next_unit
    }

    /// Fibers of the current tree tagged for deletion by the in-flight render.
    pub fn pending_deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    /// Inspect a fiber. Returns `None` for stale ids.
    pub fn fiber(&self, id: FiberId) -> Option<FiberRef<'_, H::Node>> {
        FiberRef::new(&self.fibers, id)
    }

    /// Number of live fibers across both trees.
    pub fn live_fibers(&self) -> usize {
        self.fibers.len()
    }

    /// Number of successful commits so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// True if the in-flight render's commit failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Host calls still needed to undo a failed commit.
    ///
    /// They run at the start of the next [`Engine::run_work_unit`].
    pub fn pending_rollback(&self) -> usize {
        self.rollback.len()
    }

    /// Current scheduling status.
    pub fn status(&self) -> WorkStatus {
        if self.next_unit.is_some() {
            WorkStatus::Pending
        } else if self.wip.is_some() && !self.poisoned {
            WorkStatus::ReadyToCommit
        } else {
            WorkStatus::Idle
        }
    }

    /// Start a render of `element` into `container`.
    ///
    /// Any render still in flight is discarded (last write wins); since host mutation is
    /// deferred to commit, the host tree is unaffected by the discarded render. If the render
    /// being discarded failed to commit, the host calls it made are undone by the next
    /// [`Engine::run_work_unit`].
    ///
    /// Rendering into a different container than the last commit starts from scratch: nothing
    /// is reused, and the previous container keeps its content.
    pub fn schedule_render(&mut self, element: Element, container: H::Node) {
        if let Some(stale) = self.wip.take() {
            self.abandon(stale);
        }
        self.deletions.clear();
        self.poisoned = false;

        let alternate = self
            .current
            .filter(|c| self.fibers.fiber(*c).host.as_ref() == Some(&container));
        if alternate.is_none() && self.current.is_some() {
            debug!(?container, "container changed; previous tree is not reused");
        }
        let mut root = Fiber::new(Source::Root(element), None);
        root.host = Some(container);
        root.alternate = alternate;
        let root = self.fibers.insert(root);
        self.wip = Some(root);
        self.next_unit = Some(root);
        debug!(?root, ?alternate, "render scheduled");
        self.host.schedule_continuation();
    }

    /// Perform units of work until none remain or `deadline` runs out.
    ///
    /// At least one unit is performed whenever work exists, so every call makes progress. A
    /// host fault while materializing a node leaves that unit pending; retrying is safe.
    ///
    /// Undoing a failed commit comes first; if a host call fails there, the remaining steps
    /// are kept for the next call.
    pub fn run_work_unit(
        &mut self,
        deadline: &impl Deadline,
    ) -> Result<WorkStatus, RenderError<H::Error>> {
        self.undo_failed_commit()?;
        let mut units = 0_usize;
        while let Some(unit) = self.next_unit {
            self.next_unit = self.perform_unit_of_work(unit)?;
            units += 1;
            if self.next_unit.is_some()
                && deadline.time_remaining() < self.config.yield_threshold
            {
                debug!(units, "deadline reached; yielding");
                break;
            }
        }
        trace!(units, "work slice finished");
        Ok(self.status())
    }

    /// Drive the engine for one idle slot.
    ///
    /// Runs units of work, commits once the walk has finished, and asks the host for a
    /// continuation while work remains or right after a commit.
    pub fn on_idle(
        &mut self,
        deadline: &impl Deadline,
    ) -> Result<WorkStatus, RenderError<H::Error>> {
        match self.run_work_unit(deadline)? {
            WorkStatus::Pending => self.host.schedule_continuation(),
            WorkStatus::ReadyToCommit => {
                self.commit()?;
                self.host.schedule_continuation();
            }
            WorkStatus::Idle => {}
        }
        Ok(self.status())
    }

    fn perform_unit_of_work(
        &mut self,
        id: FiberId,
    ) -> Result<Option<FiberId>, RenderError<H::Error>> {
        trace!(?id, "unit of work");
        let source = self.fibers.fiber(id).source.clone();
        if self.fibers.fiber(id).host.is_none()
            && let Some(element) = source.element()
        {
            let node = self.host.create_node(element.kind())?;
            apply_patches(&mut self.host, &node, &props::diff(&Props::new(), element.props()))?;
            self.fibers.fiber_mut(id).host = Some(node);
        }
        self.reconcile_children(id, source.children());
        Ok(self.next_after(id))
    }

    /// Pre-order successor: first child, else the nearest sibling walking up.
    pub(crate) fn next_after(&self, id: FiberId) -> Option<FiberId> {
        let fiber = self.fibers.fiber(id);
        if fiber.child.is_some() {
            return fiber.child;
        }
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let fiber = self.fibers.fiber(c);
            if fiber.sibling.is_some() {
                return fiber.sibling;
            }
            cursor = fiber.parent;
        }
        None
    }

    fn abandon(&mut self, root: FiberId) {
        for id in self.deletions.drain(..) {
            if let Some(fiber) = self.fibers.get_mut(id) {
                fiber.tag = EditTag::None;
            }
        }
        self.next_unit = None;
        let freed = self.fibers.free_subtree(root);
        debug!(?root, freed, "discarded in-flight render");
    }
}
