// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element trees: the immutable description of the desired host tree.
//!
//! Elements are produced by a front end (markup, a macro, or plain builder calls) and consumed by
//! [`Engine::schedule_render`](crate::Engine::schedule_render). They are reference counted, so
//! cloning an element or handing it to the engine never copies the subtree.
//!
//! Malformed input is rejected by [`ElementBuilder::build`] rather than surfacing later during
//! reconciliation.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;

use crate::error::ElementError;
use crate::props::{Handler, PropValue, Props, event_name, is_handler_name};

/// Property name holding the content of a text element.
pub const TEXT_VALUE: &str = "nodeValue";

/// Reserved name; children are passed structurally, never as a property.
const CHILDREN: &str = "children";

/// What kind of host node an element describes.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    /// A host node with a tag, for example `div`.
    Host(String),
    /// A text node whose content is the [`TEXT_VALUE`] property.
    Text,
}

impl ElementKind {
    /// The host tag, if any.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Host(tag) => Some(tag),
            Self::Text => None,
        }
    }
}

#[derive(Debug, PartialEq)]
struct ElementData {
    kind: ElementKind,
    props: Props,
    children: Vec<Element>,
}

/// An immutable element description: kind, properties, and ordered children.
///
/// Elements have no identity beyond their position in the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// Start building a host element with `tag`.
    pub fn builder(tag: impl Into<String>) -> ElementBuilder {
        ElementBuilder {
            tag: tag.into(),
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a text element.
    pub fn text(value: impl Into<String>) -> Self {
        let mut props = Props::new();
        props.insert(TEXT_VALUE.into(), PropValue::Str(value.into()));
        Self(Rc::new(ElementData {
            kind: ElementKind::Text,
            props,
            children: Vec::new(),
        }))
    }

    /// The element's kind.
    pub fn kind(&self) -> &ElementKind {
        &self.0.kind
    }

    /// The element's properties.
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// The element's children, in order.
    pub fn children(&self) -> &[Self] {
        &self.0.children
    }

    /// Number of elements in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Self> = Vec::from([self]);
        while let Some(e) = stack.pop() {
            count += 1;
            stack.extend(e.children());
        }
        count
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

/// Builder for host elements. See [`Element::builder`].
#[derive(Debug)]
pub struct ElementBuilder {
    tag: String,
    props: Vec<(String, PropValue)>,
    children: Vec<Element>,
}

impl ElementBuilder {
    /// Set a property. A later value for the same name wins.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.push((name.into(), value.into()));
        self
    }

    /// Register a handler under a handler-like name such as `onClick`.
    pub fn handler(self, name: impl Into<String>, f: impl Fn(&dyn Any) + 'static) -> Self {
        self.prop(name, Handler::new(f))
    }

    /// Append a child. Strings become text elements.
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append a text child.
    pub fn text(self, value: impl Into<String>) -> Self {
        self.child(Element::text(value))
    }

    /// Append several children.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Validate and build the element.
    pub fn build(self) -> Result<Element, ElementError> {
        if self.tag.is_empty() {
            return Err(ElementError::EmptyTag);
        }
        if self.tag.chars().any(char::is_whitespace) {
            return Err(ElementError::InvalidTag(self.tag));
        }
        let mut props = Props::new();
        for (name, value) in self.props {
            validate_prop(&name, &value)?;
            props.insert(name, value);
        }
        Ok(Element(Rc::new(ElementData {
            kind: ElementKind::Host(self.tag),
            props,
            children: self.children,
        })))
    }
}

fn validate_prop(name: &str, value: &PropValue) -> Result<(), ElementError> {
    if name == CHILDREN {
        return Err(ElementError::ReservedName);
    }
    let is_handler = value.as_handler().is_some();
    if is_handler_name(name) {
        if event_name(name).is_none() {
            return Err(ElementError::EmptyEventName(name.into()));
        }
        if !is_handler {
            return Err(ElementError::HandlerExpected(name.into()));
        }
    } else if is_handler {
        return Err(ElementError::UnexpectedHandler(name.into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_tree() {
        let e = Element::builder("div")
            .prop("id", "foo")
            .child(Element::builder("h1").text("title").build().unwrap())
            .child("loose text")
            .build()
            .unwrap();
        assert_eq!(e.kind().tag(), Some("div"));
        assert_eq!(e.props().get("id"), Some(&PropValue::from("foo")));
        assert_eq!(e.children().len(), 2);
        assert_eq!(e.children()[1].kind(), &ElementKind::Text);
        assert_eq!(
            e.children()[1].props().get(TEXT_VALUE),
            Some(&PropValue::from("loose text"))
        );
        assert_eq!(e.subtree_len(), 4, "div, h1, two text nodes");
    }

    #[test]
    fn rejects_malformed_tags() {
        assert_eq!(
            Element::builder("").build().unwrap_err(),
            ElementError::EmptyTag
        );
        assert_eq!(
            Element::builder("my div").build().unwrap_err(),
            ElementError::InvalidTag("my div".into())
        );
    }

    #[test]
    fn rejects_mismatched_handler_props() {
        let err = Element::builder("button")
            .prop("onClick", "not a function")
            .build()
            .unwrap_err();
        assert_eq!(err, ElementError::HandlerExpected("onClick".into()));

        let err = Element::builder("button")
            .prop("label", Handler::new(|_| {}))
            .build()
            .unwrap_err();
        assert_eq!(err, ElementError::UnexpectedHandler("label".into()));

        let err = Element::builder("button")
            .handler("on", |_| {})
            .build()
            .unwrap_err();
        assert_eq!(err, ElementError::EmptyEventName("on".into()));
    }

    #[test]
    fn rejects_children_prop() {
        let err = Element::builder("ul").prop("children", 3).build().unwrap_err();
        assert_eq!(err, ElementError::ReservedName);
    }

    #[test]
    fn later_prop_wins() {
        let e = Element::builder("p")
            .prop("class", "a")
            .prop("class", "b")
            .build()
            .unwrap();
        assert_eq!(e.props().len(), 1);
        assert_eq!(e.props().get("class"), Some(&PropValue::from("b")));
    }

    #[test]
    fn clones_share_structure() {
        let e = Element::builder("div").text("x").build().unwrap();
        let c = e.clone();
        assert!(Rc::ptr_eq(&e.0, &c.0), "clone must not copy the subtree");
        assert_eq!(e, c);
    }
}
