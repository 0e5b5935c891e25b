// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber storage: a generational arena of fiber records linked by [`FiberId`].
//!
//! Parent, first-child, next-sibling, and alternate links are arena ids rather than references,
//! so the current and work-in-progress trees can share one arena and point at each other freely.

use alloc::vec::Vec;
use core::fmt;

use crate::element::{Element, ElementKind};
use crate::props::Props;
use crate::types::{EditTag, FiberId};

/// What a fiber was produced from.
#[derive(Clone, Debug)]
pub(crate) enum Source {
    /// The root of a render; its single child is the rendered element.
    Root(Element),
    /// A regular tree position.
    Element(Element),
}

impl Source {
    pub(crate) fn children(&self) -> &[Element] {
        match self {
            Self::Root(element) => core::slice::from_ref(element),
            Self::Element(element) => element.children(),
        }
    }

    pub(crate) fn element(&self) -> Option<&Element> {
        match self {
            Self::Root(_) => None,
            Self::Element(element) => Some(element),
        }
    }

    pub(crate) fn kind(&self) -> Option<&ElementKind> {
        self.element().map(Element::kind)
    }

    pub(crate) fn props(&self) -> Option<&Props> {
        self.element().map(Element::props)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Fiber<N> {
    pub(crate) source: Source,
    pub(crate) host: Option<N>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) tag: EditTag,
}

impl<N> Fiber<N> {
    pub(crate) fn new(source: Source, parent: Option<FiberId>) -> Self {
        Self {
            source,
            host: None,
            parent,
            child: None,
            sibling: None,
            alternate: None,
            tag: EditTag::None,
        }
    }
}

pub(crate) struct FiberArena<N> {
    slots: Vec<Option<Fiber<N>>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl<N> fmt::Debug for FiberArena<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberArena")
            .field("slots_total", &self.slots.len())
            .field("slots_alive", &self.len())
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<N> FiberArena<N> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Number of live fibers.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub(crate) fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(fiber);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FiberId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(fiber));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FiberId uses 32-bit indices by design."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        FiberId::new(idx, generation)
    }

    pub(crate) fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get(id.idx())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<N>> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get_mut(id.idx())?.as_mut()
    }

    /// Access a fiber; panics if `id` is stale.
    pub(crate) fn fiber(&self, id: FiberId) -> &Fiber<N> {
        self.get(id).expect("dangling FiberId")
    }

    /// Access a fiber mutably; panics if `id` is stale.
    pub(crate) fn fiber_mut(&mut self, id: FiberId) -> &mut Fiber<N> {
        self.get_mut(id).expect("dangling FiberId")
    }

    fn remove(&mut self, id: FiberId) -> Option<Fiber<N>> {
        self.get(id)?;
        let fiber = self.slots[id.idx()].take();
        self.free_list.push(id.idx());
        fiber
    }

    /// Free `root` and every fiber reachable through its child/sibling links.
    ///
    /// Returns the number of fibers freed. Alternate links are not followed.
    pub(crate) fn free_subtree(&mut self, root: FiberId) -> usize {
        let mut freed = 0;
        let mut stack = Vec::from([root]);
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.remove(id) else {
                continue;
            };
            freed += 1;
            let mut child = fiber.child;
            while let Some(c) = child {
                stack.push(c);
                child = self.get(c).and_then(|f| f.sibling);
            }
        }
        freed
    }
}

/// Read-only view of a fiber, returned by [`Engine::fiber`](crate::Engine::fiber).
pub struct FiberRef<'a, N> {
    id: FiberId,
    fiber: &'a Fiber<N>,
    arena: &'a FiberArena<N>,
}

impl<N: fmt::Debug> fmt::Debug for FiberRef<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("tag", &self.fiber.tag)
            .field("host", &self.fiber.host)
            .finish_non_exhaustive()
    }
}

impl<'a, N> FiberRef<'a, N> {
    pub(crate) fn new(arena: &'a FiberArena<N>, id: FiberId) -> Option<Self> {
        let fiber = arena.get(id)?;
        Some(Self { id, fiber, arena })
    }

    /// This fiber's id.
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// True for the root fiber of a render, which stands for the host container.
    pub fn is_root(&self) -> bool {
        matches!(self.fiber.source, Source::Root(_))
    }

    /// Element kind; `None` for the root.
    pub fn kind(&self) -> Option<&'a ElementKind> {
        self.fiber.source.kind()
    }

    /// Properties; `None` for the root.
    pub fn props(&self) -> Option<&'a Props> {
        self.fiber.source.props()
    }

    /// The element this fiber mirrors; `None` for the root.
    pub fn element(&self) -> Option<&'a Element> {
        self.fiber.source.element()
    }

    /// Pending edit tag.
    pub fn tag(&self) -> EditTag {
        self.fiber.tag
    }

    /// Host node, once materialized.
    pub fn host(&self) -> Option<&'a N> {
        self.fiber.host.as_ref()
    }

    /// Enclosing fiber.
    pub fn parent(&self) -> Option<FiberId> {
        self.fiber.parent
    }

    /// First child.
    pub fn child(&self) -> Option<FiberId> {
        self.fiber.child
    }

    /// Next sibling.
    pub fn sibling(&self) -> Option<FiberId> {
        self.fiber.sibling
    }

    /// The previous render's fiber at the same position, while a render is in flight.
    pub fn alternate(&self) -> Option<FiberId> {
        self.fiber.alternate
    }

    /// Iterate the child fibers in order.
    pub fn children(&self) -> impl Iterator<Item = FiberRef<'a, N>> + 'a {
        let arena = self.arena;
        core::iter::successors(
            self.fiber.child.and_then(|c| Self::new(arena, c)),
            move |f| f.fiber.sibling.and_then(|s| Self::new(arena, s)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tag: &str) -> Source {
        Source::Element(Element::builder(tag).build().unwrap())
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut arena: FiberArena<()> = FiberArena::new();
        let a = arena.insert(Fiber::new(leaf("a"), None));
        assert!(arena.get(a).is_some());
        assert_eq!(arena.free_subtree(a), 1);
        assert!(arena.get(a).is_none(), "freed id must be stale");

        let b = arena.insert(Fiber::new(leaf("b"), None));
        assert!(arena.get(b).is_some());
        assert!(arena.get(a).is_none());
        assert_eq!(a.0, b.0, "slot is reused");
        assert!(b.1 > a.1, "generation must increase on reuse");
    }

    #[test]
    fn free_subtree_follows_children_and_siblings() {
        let mut arena: FiberArena<()> = FiberArena::new();
        let root = arena.insert(Fiber::new(leaf("root"), None));
        let c1 = arena.insert(Fiber::new(leaf("c1"), Some(root)));
        let c2 = arena.insert(Fiber::new(leaf("c2"), Some(root)));
        let g = arena.insert(Fiber::new(leaf("g"), Some(c2)));
        let other = arena.insert(Fiber::new(leaf("other"), None));
        arena.fiber_mut(root).child = Some(c1);
        arena.fiber_mut(c1).sibling = Some(c2);
        arena.fiber_mut(c2).child = Some(g);

        assert_eq!(arena.free_subtree(root), 4);
        assert_eq!(arena.len(), 1, "unrelated fibers survive");
        assert!(arena.get(other).is_some());
    }

    #[test]
    fn fiber_ref_walks_children() {
        let mut arena: FiberArena<u8> = FiberArena::new();
        let root = arena.insert(Fiber::new(leaf("root"), None));
        let c1 = arena.insert(Fiber::new(leaf("c1"), Some(root)));
        let c2 = arena.insert(Fiber::new(leaf("c2"), Some(root)));
        arena.fiber_mut(root).child = Some(c1);
        arena.fiber_mut(c1).sibling = Some(c2);
        arena.fiber_mut(c2).host = Some(9);

        let r = FiberRef::new(&arena, root).unwrap();
        let tags: Vec<_> = r
            .children()
            .map(|c| c.kind().and_then(ElementKind::tag))
            .collect();
        assert_eq!(tags, [Some("c1"), Some("c2")]);
        assert_eq!(r.children().last().and_then(|c| c.host().copied()), Some(9));
    }
}
