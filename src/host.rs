//! The page environment a [`ToastManager`](crate::ToastManager) drives.
//!
//! A host supplies the handful of DOM operations needed to build and tear down a
//! toast, plus the two scheduling primitives of a browser event loop: "run on the
//! next frame" and "run after N milliseconds". [`WebHost`](crate::web::WebHost)
//! talks to the real page, [`HeadlessHost`](crate::headless::HeadlessHost) keeps
//! everything in memory behind a virtual clock.
//!
//! Callbacks are only ever invoked from the event loop, never re-entrantly from
//! within a host method. The one exception is [`Host::dispatch_click`], which runs
//! the node's click listener before returning.

use crate::Result;

pub type Callback = Box<dyn FnOnce()>;
pub type Handler = Box<dyn FnMut()>;

/// Hosts are cheap handles onto the page; every live toast keeps a clone.
pub trait Host: Clone + 'static {
    type Node: Clone + PartialEq + 'static;
    /// A pending timer that can be stopped with [`Host::cancel`].
    type Timer: 'static;
    /// A registered click listener, removed when dropped.
    type Listener: 'static;

    fn body(&self) -> Result<Self::Node>;

    /// First element in the document carrying `class`, if any.
    fn find_by_class(&self, class: &str) -> Option<Self::Node>;

    fn create_element(&self, tag: &str) -> Result<Self::Node>;

    fn set_class_name(&self, node: &Self::Node, classes: &str);

    fn add_class(&self, node: &Self::Node, class: &str) -> Result<()>;

    fn remove_class(&self, node: &Self::Node, class: &str) -> Result<()>;

    fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    /// Replaces the children of `node` with a single text node.
    fn set_text(&self, node: &Self::Node, text: &str);

    /// Replaces the children of `node` with parsed, unescaped markup.
    fn set_markup(&self, node: &Self::Node, markup: &str);

    fn append(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    /// Direct children of `node` carrying `class`, in document order.
    fn children_by_class(&self, node: &Self::Node, class: &str) -> Vec<Self::Node>;

    fn has_parent(&self, node: &Self::Node) -> bool;

    fn detach(&self, node: &Self::Node);

    fn on_click(&self, node: &Self::Node, handler: Handler) -> Result<Self::Listener>;

    /// Delivers a click to `node` synchronously.
    fn dispatch_click(&self, node: &Self::Node) -> Result<()>;

    fn next_frame(&self, callback: Callback) -> Result<()>;

    fn schedule(&self, delay_ms: u32, callback: Callback) -> Result<Self::Timer>;

    fn cancel(&self, timer: Self::Timer);

    /// Fire-and-forget variant of [`Host::schedule`]; the callback always runs.
    fn defer(&self, delay_ms: u32, callback: Callback) -> Result<()>;
}
