//! An in-memory page with a virtual clock.
//!
//! Nothing happens on its own: timers fire when the clock is moved with
//! [`HeadlessHost::advance`], frame callbacks run on [`HeadlessHost::frame`] and
//! clicks are delivered with [`HeadlessHost::click`]. The DOM is a plain tree of
//! elements that can be inspected or rendered back to HTML.

use crate::host::{Callback, Handler, Host};
use crate::Result;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimerId(u64);

#[derive(Clone)]
pub struct HeadlessHost {
    state: Rc<RefCell<State>>,
}

struct State {
    nodes: Vec<NodeData>,
    now: u64,
    sequence: u64,
    timers: Vec<Pending>,
    frames: Vec<Callback>,
}

#[derive(Default)]
struct NodeData {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    content: Option<Inline>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    click: Option<(u64, Rc<RefCell<Handler>>)>,
}

enum Inline {
    Text(String),
    Markup(String),
}

struct Pending {
    due: u64,
    sequence: u64,
    callback: Callback,
}

const BODY: NodeId = NodeId(0);

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        let body = NodeData {
            tag: "body".to_string(),
            ..NodeData::default()
        };
        Self {
            state: Rc::new(RefCell::new(State {
                nodes: vec![body],
                now: 0,
                sequence: 0,
                timers: Vec::new(),
                frames: Vec::new(),
            })),
        }
    }

    /// Milliseconds elapsed on the virtual clock.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Moves the clock forward, firing due timers in order. Timers scheduled by a
    /// callback fire within the same call if they fall due before the target time.
    /// Returns the number of callbacks run.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.state.borrow().now + ms;
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let index = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, pending)| pending.due <= target)
                    .min_by_key(|(_, pending)| (pending.due, pending.sequence))
                    .map(|(index, _)| index);
                index.map(|index| {
                    let pending = state.timers.remove(index);
                    state.now = pending.due;
                    pending.callback
                })
            };
            match next {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }
        self.state.borrow_mut().now = target;
        fired
    }

    /// Runs the callbacks requested before this frame. Returns how many ran.
    pub fn frame(&self) -> usize {
        let frames = std::mem::take(&mut self.state.borrow_mut().frames);
        let count = frames.len();
        for callback in frames {
            callback();
        }
        count
    }

    /// Delivers a click to `node`. Returns whether a listener handled it.
    pub fn click(&self, node: NodeId) -> bool {
        let handler = self.state.borrow().nodes[node.0]
            .click
            .as_ref()
            .map(|(_, handler)| handler.clone());
        match handler {
            Some(handler) => {
                let mut call = handler.borrow_mut();
                (*call)();
                true
            }
            None => false,
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn has_listener(&self, node: NodeId) -> bool {
        self.state.borrow().nodes[node.0].click.is_some()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state.borrow().nodes[node.0].children.clone()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().nodes[node.0].parent
    }

    pub fn tag(&self, node: NodeId) -> String {
        self.state.borrow().nodes[node.0].tag.clone()
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.state.borrow().nodes[node.0].classes.clone()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.state.borrow().nodes[node.0]
            .classes
            .iter()
            .any(|c| c == class)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.state.borrow().nodes[node.0]
            .attributes
            .get(name)
            .cloned()
    }

    /// Every element attached under the body that carries `class`, in document order.
    pub fn find_all_by_class(&self, class: &str) -> Vec<NodeId> {
        let state = self.state.borrow();
        let mut found = Vec::new();
        state.walk(BODY, &mut |id: NodeId, data: &NodeData| {
            if data.classes.iter().any(|c| c == class) {
                found.push(id);
            }
        });
        found
    }

    /// Concatenated text of `node` and its descendants. Markup is returned with tags stripped.
    pub fn text_content(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut text = String::new();
        state.collect_text(node, &mut text);
        text
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut html = String::new();
        state.render_inner(node, &mut html);
        html
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let state = self.state.borrow();
        let mut html = String::new();
        state.render(node, &mut html);
        html
    }

    fn with_node<R>(&self, node: &NodeId, f: impl FnOnce(&mut NodeData) -> R) -> R {
        f(&mut self.state.borrow_mut().nodes[node.0])
    }

    fn push_timer(&self, delay_ms: u32, callback: Callback) -> TimerId {
        let mut state = self.state.borrow_mut();
        state.sequence += 1;
        let sequence = state.sequence;
        let due = state.now + u64::from(delay_ms);
        state.timers.push(Pending {
            due,
            sequence,
            callback,
        });
        TimerId(sequence)
    }
}

impl State {
    fn walk(&self, node: NodeId, visit: &mut impl FnMut(NodeId, &NodeData)) {
        let data = &self.nodes[node.0];
        visit(node, data);
        for child in &data.children {
            self.walk(*child, visit);
        }
    }

    fn release_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        match &data.content {
            Some(Inline::Text(text)) => out.push_str(text),
            Some(Inline::Markup(markup)) => out.push_str(&strip_tags(markup)),
            None => {}
        }
        for child in &data.children {
            self.collect_text(*child, out);
        }
    }

    fn render(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        out.push('<');
        out.push_str(&data.tag);
        if !data.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape(&data.classes.join(" "))));
        }
        for (name, value) in &data.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
        }
        out.push('>');
        self.render_inner(node, out);
        out.push_str(&format!("</{}>", data.tag));
    }

    fn render_inner(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        match &data.content {
            Some(Inline::Text(text)) => out.push_str(&escape(text)),
            Some(Inline::Markup(markup)) => out.push_str(markup),
            None => {}
        }
        for child in &data.children {
            self.render(*child, out);
        }
    }
}

fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

/// Keeps a click handler registered; unregisters it when dropped.
pub struct ClickBinding {
    state: Weak<RefCell<State>>,
    node: NodeId,
    key: u64,
}

impl Drop for ClickBinding {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.borrow_mut();
            let click = &mut state.nodes[self.node.0].click;
            if matches!(click, Some((key, _)) if *key == self.key) {
                *click = None;
            }
        }
    }
}

impl Host for HeadlessHost {
    type Node = NodeId;
    type Timer = TimerId;
    type Listener = ClickBinding;

    fn body(&self) -> Result<NodeId> {
        Ok(BODY)
    }

    fn find_by_class(&self, class: &str) -> Option<NodeId> {
        self.find_all_by_class(class).into_iter().next()
    }

    fn create_element(&self, tag: &str) -> Result<NodeId> {
        let mut state = self.state.borrow_mut();
        state.nodes.push(NodeData {
            tag: tag.to_string(),
            ..NodeData::default()
        });
        Ok(NodeId(state.nodes.len() - 1))
    }

    fn set_class_name(&self, node: &NodeId, classes: &str) {
        self.with_node(node, |data| {
            data.classes = classes.split_whitespace().map(str::to_string).collect();
        })
    }

    fn add_class(&self, node: &NodeId, class: &str) -> Result<()> {
        self.with_node(node, |data| {
            if !data.classes.iter().any(|c| c == class) {
                data.classes.push(class.to_string());
            }
        });
        Ok(())
    }

    fn remove_class(&self, node: &NodeId, class: &str) -> Result<()> {
        self.with_node(node, |data| data.classes.retain(|c| c != class));
        Ok(())
    }

    fn get_attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attribute(*node, name)
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<()> {
        self.with_node(node, |data| {
            data.attributes.insert(name.to_string(), value.to_string())
        });
        Ok(())
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        let mut state = self.state.borrow_mut();
        state.release_children(*node);
        state.nodes[node.0].content = Some(Inline::Text(text.to_string()));
    }

    fn set_markup(&self, node: &NodeId, markup: &str) {
        let mut state = self.state.borrow_mut();
        state.release_children(*node);
        state.nodes[node.0].content = Some(Inline::Markup(markup.to_string()));
    }

    fn append(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.unlink(*child);
        state.nodes[child.0].parent = Some(*parent);
        state.nodes[parent.0].children.push(*child);
        Ok(())
    }

    fn children_by_class(&self, node: &NodeId, class: &str) -> Vec<NodeId> {
        self.children(*node)
            .into_iter()
            .filter(|child| self.has_class(*child, class))
            .collect()
    }

    fn has_parent(&self, node: &NodeId) -> bool {
        self.state.borrow().nodes[node.0].parent.is_some()
    }

    fn detach(&self, node: &NodeId) {
        self.state.borrow_mut().unlink(*node)
    }

    fn on_click(&self, node: &NodeId, handler: Handler) -> Result<ClickBinding> {
        let mut state = self.state.borrow_mut();
        state.sequence += 1;
        let key = state.sequence;
        state.nodes[node.0].click = Some((key, Rc::new(RefCell::new(handler))));
        Ok(ClickBinding {
            state: Rc::downgrade(&self.state),
            node: *node,
            key,
        })
    }

    fn dispatch_click(&self, node: &NodeId) -> Result<()> {
        self.click(*node);
        Ok(())
    }

    fn next_frame(&self, callback: Callback) -> Result<()> {
        self.state.borrow_mut().frames.push(callback);
        Ok(())
    }

    fn schedule(&self, delay_ms: u32, callback: Callback) -> Result<TimerId> {
        Ok(self.push_timer(delay_ms, callback))
    }

    fn cancel(&self, timer: TimerId) {
        self.state
            .borrow_mut()
            .timers
            .retain(|pending| pending.sequence != timer.0);
    }

    fn defer(&self, delay_ms: u32, callback: Callback) -> Result<()> {
        self.push_timer(delay_ms, callback);
        Ok(())
    }
}
