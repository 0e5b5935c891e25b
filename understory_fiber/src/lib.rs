// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_fiber --heading-base-level=0

//! Understory Fiber: an interruptible reconciler for element trees.
//!
//! Understory Fiber keeps a host tree (a DOM, a widget tree, an in-memory mirror) in sync with
//! an immutable description of what it should contain.
//!
//! - Each render is split into small units of work, one per tree position, so a long render can
//!   be spread across many idle slots without blocking the host.
//! - Each render is diffed against the last committed one; host nodes are reused where the kind
//!   at a position is unchanged and only changed properties are written.
//! - Host mutations are deferred to a single uninterruptible [`Engine::commit`], so the host tree
//!   never shows a partially reconciled render.
//!
//! ## Model
//!
//! - [`Element`]: immutable, reference-counted description of a node: a kind, properties, and
//!   ordered children. Built with [`Element::builder`] or [`Element::text`].
//! - Fibers: the engine's per-position work records. At most two trees exist: the committed
//!   `current` tree and the work-in-progress tree. Each work-in-progress fiber links to its
//!   counterpart in `current` through its alternate. Inspect them with [`Engine::fiber`].
//! - [`HostAdapter`]: the primitive host operations the engine needs. [`adapters::memory`]
//!   provides an in-memory implementation.
//! - [`Deadline`]: how much time is left in the current slot. The engine yields when it drops
//!   below [`EngineConfig::yield_threshold`].
//!
//! ## Reconciliation is positional
//!
//! Children are matched by index and kind only. There are no keys, so inserting at the head of a
//! list rewrites every following position in place rather than moving nodes.
//!
//! ## Properties and handlers
//!
//! A property named `on…` holds a [`Handler`] registered for the lowercased remainder of the
//! name (`onClick` registers `click`). On update an old handler is always unregistered before its
//! replacement is registered. See [`props::diff`] for the exact patch order.
//!
//! ## Example
//!
//! ```
//! use understory_fiber::adapters::memory::MemoryHost;
//! use understory_fiber::{Element, Engine, StepBudget, WorkStatus};
//!
//! let mut host = MemoryHost::new();
//! let container = host.create_container();
//! let mut engine = Engine::new(host);
//!
//! let app = Element::builder("div")
//!     .prop("id", "foo")
//!     .child(Element::builder("h1").text("Hello").build().unwrap())
//!     .build()
//!     .unwrap();
//! engine.schedule_render(app, container);
//!
//! // Two units of work per slot until the render is committed.
//! while engine.on_idle(&StepBudget::new(2)).unwrap() != WorkStatus::Idle {}
//!
//! assert_eq!(
//!     engine.host().snapshot(container).to_string(),
//!     r#"<div id="foo"><h1>Hello</h1></div>"#
//! );
//! ```
//!
//! This crate is `no_std` and uses `alloc`. The default `std` feature adds
//! [`InstantDeadline`] and forwards `std` to dependencies.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod adapters;
mod commit;
mod deadline;
mod element;
mod engine;
mod error;
mod fiber;
mod host;
pub mod props;
mod reconcile;
mod types;

pub use commit::CommitReport;
#[cfg(feature = "std")]
pub use deadline::InstantDeadline;
pub use deadline::{Deadline, StepBudget, Unbounded};
pub use element::{Element, ElementBuilder, ElementKind, TEXT_VALUE};
pub use engine::{Engine, EngineConfig, WorkStatus};
pub use error::{ElementError, RenderError};
pub use fiber::FiberRef;
pub use host::HostAdapter;
pub use props::{Handler, PropPatch, PropValue, Props};
pub use types::{EditKinds, EditTag, FiberId};
