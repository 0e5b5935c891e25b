// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! - [`ElementError`]: malformed element input, reported when the element is built.
//! - [`RenderError`]: faults while rendering or committing, generic over the host's error.

use alloc::string::String;
use thiserror::Error;

/// Malformed element description.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ElementError {
    /// The host tag is empty.
    #[error("element tag is empty")]
    EmptyTag,
    /// The host tag contains whitespace.
    #[error("element tag `{0}` contains whitespace")]
    InvalidTag(String),
    /// A property used the reserved name `children`.
    #[error("property name `children` is reserved for structural children")]
    ReservedName,
    /// A handler-like name has nothing after the `on` prefix.
    #[error("handler property `{0}` has no event name after the prefix")]
    EmptyEventName(String),
    /// A handler-like name holds a plain value.
    #[error("property `{0}` is named like a handler but holds a plain value")]
    HandlerExpected(String),
    /// A handler is stored under a plain name.
    #[error("property `{0}` holds a handler but is not named like one")]
    UnexpectedHandler(String),
}

/// Failure while rendering or committing.
///
/// A host fault during commit leaves the committed tree untouched and the engine poisoned: the
/// in-flight render is kept for inspection, and the next
/// [`Engine::schedule_render`](crate::Engine::schedule_render) discards it and starts over.
#[derive(Debug, Error)]
pub enum RenderError<E>
where
    E: core::error::Error + 'static,
{
    /// A host adapter call failed.
    #[error("host adapter fault")]
    Host(#[from] E),
    /// [`Engine::commit`](crate::Engine::commit) was called while units of work remain.
    #[error("commit requested while units of work are still pending")]
    RenderInProgress,
    /// A previous commit of this render failed; schedule a new render.
    #[error("a previous commit of this render failed; schedule a new render")]
    Poisoned,
}
