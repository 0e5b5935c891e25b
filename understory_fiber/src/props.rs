// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element properties: values, event handlers, and the property diff applied on update.
//!
//! ## Naming convention
//!
//! A property whose name starts with [`HANDLER_PREFIX`] (`on`) is handler-like and must hold a
//! [`Handler`]. Its event name is the remainder of the name, ASCII-lowercased, so `onClick`
//! registers for `click`. Every other property is plain.
//!
//! ## Diff order
//!
//! [`diff`] emits patches in a fixed order so that an old handler is never live at the same
//! time as its replacement:
//!
//! 1. [`PropPatch::RemoveHandler`] for old handlers that were removed or changed.
//! 2. [`PropPatch::Clear`] for plain properties that were removed.
//! 3. [`PropPatch::Set`] for plain properties that were added or changed.
//! 4. [`PropPatch::AddHandler`] for new handlers that were added or changed.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

/// Prefix marking a property name as handler-like.
pub const HANDLER_PREFIX: &str = "on";

/// Returns true if `name` follows the handler naming convention.
pub fn is_handler_name(name: &str) -> bool {
    name.starts_with(HANDLER_PREFIX)
}

/// Recovers the event name from a handler-like property name.
///
/// Returns `None` if `name` is not handler-like or has nothing after the prefix.
pub fn event_name(name: &str) -> Option<String> {
    let event = name.strip_prefix(HANDLER_PREFIX)?;
    if event.is_empty() {
        return None;
    }
    Some(event.to_ascii_lowercase())
}

type Callback = dyn Fn(&dyn Any);

/// A reference-counted event callback.
///
/// Handlers compare by identity: two handlers are equal only if they are clones of the same
/// callback. The payload is whatever the host passes when the event fires.
#[derive(Clone)]
pub struct Handler(Rc<Callback>);

impl Handler {
    /// Wrap a callback.
    pub fn new(f: impl Fn(&dyn Any) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the callback with a host event payload.
    pub fn call(&self, event: &dyn Any) {
        (self.0)(event);
    }

    /// Returns true if both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// A property value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Text value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating point value. `NaN` never compares equal, so it is rewritten on every update.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Event handler; only valid under a handler-like name.
    Handler(Handler),
}

impl PropValue {
    /// Returns the handler if this value is one.
    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            Self::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// Returns the text if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Handler(_) => f.write_str("<handler>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Handler> for PropValue {
    fn from(value: Handler) -> Self {
        Self::Handler(value)
    }
}

/// Property mapping of an element, ordered by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: BTreeMap<String, PropValue>,
}

impl Props {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a property by name.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    /// Iterate all properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate plain (non-handler) properties in name order.
    pub fn plain(&self) -> impl Iterator<Item = (&str, &PropValue)> + '_ {
        self.iter().filter(|(_, v)| v.as_handler().is_none())
    }

    /// Iterate handler properties in name order.
    pub fn handlers(&self) -> impl Iterator<Item = (&str, &Handler)> + '_ {
        self.iter().filter_map(|(k, v)| v.as_handler().map(|h| (k, h)))
    }

    pub(crate) fn insert(&mut self, name: String, value: PropValue) {
        self.entries.insert(name, value);
    }
}

/// A single host property mutation produced by [`diff`].
#[derive(Clone, Debug, PartialEq)]
pub enum PropPatch {
    /// Unregister `handler` for `event`.
    RemoveHandler {
        /// Event name (prefix stripped, lowercased).
        event: String,
        /// The previously registered handler.
        handler: Handler,
    },
    /// Reset a removed plain property to its default.
    Clear {
        /// Property name.
        name: String,
    },
    /// Write a new or changed plain property.
    Set {
        /// Property name.
        name: String,
        /// New value.
        value: PropValue,
    },
    /// Register `handler` for `event`.
    AddHandler {
        /// Event name (prefix stripped, lowercased).
        event: String,
        /// The handler to register.
        handler: Handler,
    },
}

/// Compute the ordered patch list turning `old` into `new`.
///
/// Equal mappings produce an empty list.
pub fn diff(old: &Props, new: &Props) -> Vec<PropPatch> {
    let mut patches = Vec::new();

    for (name, handler) in old.handlers() {
        let kept = new
            .get(name)
            .and_then(PropValue::as_handler)
            .is_some_and(|h| h.ptr_eq(handler));
        if !kept && let Some(event) = event_name(name) {
            patches.push(PropPatch::RemoveHandler {
                event,
                handler: handler.clone(),
            });
        }
    }

    for (name, _) in old.plain() {
        if new.get(name).is_none() {
            patches.push(PropPatch::Clear { name: name.into() });
        }
    }

    for (name, value) in new.plain() {
        if old.get(name) != Some(value) {
            patches.push(PropPatch::Set {
                name: name.into(),
                value: value.clone(),
            });
        }
    }

    for (name, handler) in new.handlers() {
        let existed = old
            .get(name)
            .and_then(PropValue::as_handler)
            .is_some_and(|h| h.ptr_eq(handler));
        if !existed && let Some(event) = event_name(name) {
            patches.push(PropPatch::AddHandler {
                event,
                handler: handler.clone(),
            });
        }
    }

    patches
}

/// The patch that undoes `patch` on a node whose properties were `old` before it was applied.
pub(crate) fn invert(patch: &PropPatch, old: &Props) -> PropPatch {
    match patch {
        PropPatch::RemoveHandler { event, handler } => PropPatch::AddHandler {
            event: event.clone(),
            handler: handler.clone(),
        },
        PropPatch::AddHandler { event, handler } => PropPatch::RemoveHandler {
            event: event.clone(),
            handler: handler.clone(),
        },
        PropPatch::Clear { name } | PropPatch::Set { name, .. } => match old.get(name) {
            Some(value) if value.as_handler().is_none() => PropPatch::Set {
                name: name.clone(),
                value: value.clone(),
            },
            _ => PropPatch::Clear { name: name.clone() },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: &[(&str, PropValue)]) -> Props {
        let mut p = Props::new();
        for (k, v) in entries {
            p.insert((*k).into(), v.clone());
        }
        p
    }

    #[test]
    fn event_names_strip_prefix_and_lowercase() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("onMouseOver").as_deref(), Some("mouseover"));
        assert_eq!(event_name("on"), None, "bare prefix has no event");
        assert_eq!(event_name("title"), None);
        assert!(is_handler_name("onInput"));
        assert!(!is_handler_name("id"));
    }

    #[test]
    fn equal_props_produce_no_patches() {
        let h = Handler::new(|_| {});
        let a = props(&[("id", "x".into()), ("onClick", h.clone().into())]);
        let b = props(&[("id", "x".into()), ("onClick", h.into())]);
        assert!(diff(&a, &b).is_empty(), "identical mappings need no patches");
    }

    #[test]
    fn plain_props_are_cleared_and_set() {
        let old = props(&[("id", "a".into()), ("title", "t".into())]);
        let new = props(&[("id", "b".into()), ("hidden", true.into())]);
        let patches = diff(&old, &new);
        assert_eq!(
            patches,
            [
                PropPatch::Clear {
                    name: "title".into()
                },
                PropPatch::Set {
                    name: "hidden".into(),
                    value: PropValue::Bool(true)
                },
                PropPatch::Set {
                    name: "id".into(),
                    value: "b".into()
                },
            ]
        );
    }

    #[test]
    fn handler_replacement_removes_before_adding() {
        let h1 = Handler::new(|_| {});
        let h2 = Handler::new(|_| {});
        let old = props(&[("onClick", h1.clone().into())]);
        let new = props(&[("onClick", h2.clone().into())]);
        let patches = diff(&old, &new);
        assert_eq!(patches.len(), 2, "one removal and one registration");
        assert_eq!(
            patches[0],
            PropPatch::RemoveHandler {
                event: "click".into(),
                handler: h1
            }
        );
        assert_eq!(
            patches[1],
            PropPatch::AddHandler {
                event: "click".into(),
                handler: h2
            }
        );
    }

    #[test]
    fn removed_handler_is_unregistered() {
        let h = Handler::new(|_| {});
        let old = props(&[("onKeyDown", h.clone().into()), ("id", "x".into())]);
        let new = props(&[("id", "x".into())]);
        assert_eq!(
            diff(&old, &new),
            [PropPatch::RemoveHandler {
                event: "keydown".into(),
                handler: h
            }]
        );
    }

    #[test]
    fn inverted_patches_restore_old_props() {
        let h1 = Handler::new(|_| {});
        let h2 = Handler::new(|_| {});
        let old = props(&[
            ("id", "a".into()),
            ("title", "t".into()),
            ("onClick", h1.clone().into()),
        ]);
        let new = props(&[
            ("id", "b".into()),
            ("hidden", true.into()),
            ("onClick", h2.clone().into()),
        ]);
        let undo: Vec<_> = diff(&old, &new)
            .iter()
            .rev()
            .map(|p| invert(p, &old))
            .collect();
        assert_eq!(
            undo,
            [
                PropPatch::RemoveHandler {
                    event: "click".into(),
                    handler: h2
                },
                PropPatch::Set {
                    name: "id".into(),
                    value: "a".into()
                },
                PropPatch::Clear {
                    name: "hidden".into()
                },
                PropPatch::Set {
                    name: "title".into(),
                    value: "t".into()
                },
                PropPatch::AddHandler {
                    event: "click".into(),
                    handler: h1
                },
            ]
        );
    }

    #[test]
    fn handlers_compare_by_identity() {
        let a = Handler::new(|_| {});
        let b = Handler::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b, "distinct callbacks are never equal");
    }

    #[test]
    fn handler_receives_payload() {
        use core::cell::Cell;
        let seen = Rc::new(Cell::new(0_i32));
        let sink = Rc::clone(&seen);
        let h = Handler::new(move |ev| {
            if let Some(v) = ev.downcast_ref::<i32>() {
                sink.set(*v);
            }
        });
        h.call(&7_i32);
        assert_eq!(seen.get(), 7);
    }
}
