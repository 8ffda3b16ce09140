use crate::host::Host;
use crate::{Config, Result, Severity};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

pub type ToastId = u64;

const TOAST_CLASS: &str = "toast";
const SHOW_CLASS: &str = "show";
pub(crate) const ID_ATTRIBUTE: &str = "data-toast-id";
/// Last id handed out on this container, shared by every manager that adopts it.
const COUNTER_ATTRIBUTE: &str = "data-toast-counter";

/// What goes in a toast's message span.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Content {
    /// Inserted as text; never interpreted as markup.
    Text(String),
    /// Inserted as raw HTML. Only for trusted input.
    Markup(String),
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

#[derive(Clone, Debug)]
pub struct ToastHandle<N> {
    pub id: ToastId,
    pub node: N,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    /// Attached, waiting for the next frame to add `show`.
    Entering,
    Shown,
    /// `show` removed, detach pending.
    Hiding,
}

type Registry<H> = RefCell<BTreeMap<ToastId, Rc<Toast<H>>>>;

/// Shows toasts in a single page container and removes them on timeout or click.
///
/// Each toast goes through `Entering -> Shown -> Hiding` and is detached once the
/// hide delay has passed. Whichever of the timeout or a manual dismissal comes
/// first wins; a manual dismissal cancels the pending timeout.
///
/// Toasts own their lifecycle: dropping the manager does not stop the ones already
/// on screen from timing out or being clicked away. Managers adopting the same
/// container share its id sequence, and [`ToastManager::clear`] empties the whole
/// container.
pub struct ToastManager<H: Host> {
    host: H,
    config: Config,
    container: H::Node,
    toasts: Rc<Registry<H>>,
}

/// One toast's state. Its pending callbacks hold it alive until it is detached.
struct Toast<H: Host> {
    id: ToastId,
    host: H,
    node: H::Node,
    hide_delay_ms: u32,
    phase: Cell<Phase>,
    expiry: RefCell<Option<H::Timer>>,
    click: RefCell<Option<H::Listener>>,
    registry: Weak<Registry<H>>,
}

impl<H: Host> ToastManager<H> {
    pub fn new(host: H) -> Result<Self> {
        Self::with_config(host, Config::default())
    }

    /// Adopts the page's existing toast container, or creates one at the end of the body.
    pub fn with_config(host: H, config: Config) -> Result<Self> {
        let container = match host.find_by_class(&config.container_class) {
            Some(container) => {
                log::debug!("reusing existing .{} element", config.container_class);
                container
            }
            None => {
                let container = host.create_element("div")?;
                host.set_class_name(&container, &config.container_class);
                host.append(&host.body()?, &container)?;
                container
            }
        };

        Ok(Self {
            host,
            config,
            container,
            toasts: Rc::new(RefCell::new(BTreeMap::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn container(&self) -> &H::Node {
        &self.container
    }

    /// Shows `message` as plain text.
    pub fn show(
        &self,
        message: &str,
        severity: Severity,
        duration_ms: u32,
    ) -> Result<ToastHandle<H::Node>> {
        self.show_content(message, severity, duration_ms)
    }

    /// Shows an info toast for the configured default duration.
    pub fn show_default(&self, message: &str) -> Result<ToastHandle<H::Node>> {
        self.show(message, Severity::Info, self.config.duration_ms)
    }

    pub fn show_content(
        &self,
        content: impl Into<Content>,
        severity: Severity,
        duration_ms: u32,
    ) -> Result<ToastHandle<H::Node>> {
        let id = self.next_id()?;
        let node = self.render(id, &content.into(), severity)?;
        self.host.append(&self.container, &node)?;

        let toast = Rc::new(Toast {
            id,
            host: self.host.clone(),
            node: node.clone(),
            hide_delay_ms: self.config.hide_delay_ms,
            phase: Cell::new(Phase::Entering),
            expiry: RefCell::new(None),
            click: RefCell::new(None),
            registry: Rc::downgrade(&self.toasts),
        });
        if let Err(e) = toast.arm(duration_ms) {
            toast.abort();
            return Err(e);
        }
        self.toasts.borrow_mut().insert(id, toast);

        log::debug!("showing {} toast {} for {}ms", severity, id, duration_ms);
        Ok(ToastHandle { id, node })
    }

    pub fn success(&self, message: &str) -> Result<ToastHandle<H::Node>> {
        self.notify(message, Severity::Success)
    }

    pub fn success_for(&self, message: &str, duration_ms: u32) -> Result<ToastHandle<H::Node>> {
        self.show(message, Severity::Success, duration_ms)
    }

    pub fn error(&self, message: &str) -> Result<ToastHandle<H::Node>> {
        self.notify(message, Severity::Error)
    }

    pub fn error_for(&self, message: &str, duration_ms: u32) -> Result<ToastHandle<H::Node>> {
        self.show(message, Severity::Error, duration_ms)
    }

    pub fn warning(&self, message: &str) -> Result<ToastHandle<H::Node>> {
        self.notify(message, Severity::Warning)
    }

    pub fn warning_for(&self, message: &str, duration_ms: u32) -> Result<ToastHandle<H::Node>> {
        self.show(message, Severity::Warning, duration_ms)
    }

    pub fn info(&self, message: &str) -> Result<ToastHandle<H::Node>> {
        self.notify(message, Severity::Info)
    }

    pub fn info_for(&self, message: &str, duration_ms: u32) -> Result<ToastHandle<H::Node>> {
        self.show(message, Severity::Info, duration_ms)
    }

    fn notify(&self, message: &str, severity: Severity) -> Result<ToastHandle<H::Node>> {
        self.show(message, severity, self.config.durations.get(severity))
    }

    /// Starts hiding the toast and cancels its timeout, as a click would.
    /// Returns false if it is already hiding or gone.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.toast(id).map_or(false, |toast| toast.begin_hide(true))
    }

    /// Like [`ToastManager::dismiss`], for a toast element this manager showed.
    pub fn dismiss_node(&self, node: &H::Node) -> bool {
        self.owned(node).map_or(false, |toast| toast.begin_hide(true))
    }

    /// Dismisses every toast in the container, including those shown by other
    /// managers sharing it. Those are clicked, so they leave through their own
    /// manager's removal path.
    pub fn clear(&self) {
        for node in self.host.children_by_class(&self.container, TOAST_CLASS) {
            match self.owned(&node) {
                Some(toast) => {
                    toast.begin_hide(true);
                }
                None => {
                    if let Err(e) = self.host.dispatch_click(&node) {
                        log::error!("unable to dismiss foreign toast: {}", e)
                    }
                }
            }
        }
    }

    /// Number of this manager's toasts still attached, including those hiding.
    pub fn len(&self) -> usize {
        self.toasts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ToastId) -> bool {
        self.toasts.borrow().contains_key(&id)
    }

    /// Whether the toast is attached and not yet hiding.
    pub fn is_visible(&self, id: ToastId) -> bool {
        self.toast(id)
            .map_or(false, |toast| toast.phase.get() != Phase::Hiding)
    }

    fn toast(&self, id: ToastId) -> Option<Rc<Toast<H>>> {
        self.toasts.borrow().get(&id).cloned()
    }

    /// The toast rendered as `node`, if this manager showed it.
    fn owned(&self, node: &H::Node) -> Option<Rc<Toast<H>>> {
        self.host
            .get_attribute(node, ID_ATTRIBUTE)
            .and_then(|id| id.parse::<ToastId>().ok())
            .and_then(|id| self.toast(id))
            .filter(|toast| toast.node == *node)
    }

    fn next_id(&self) -> Result<ToastId> {
        let last = self
            .host
            .get_attribute(&self.container, COUNTER_ATTRIBUTE)
            .and_then(|id| id.parse::<ToastId>().ok())
            .unwrap_or(0);
        let id = last + 1;
        self.host
            .set_attribute(&self.container, COUNTER_ATTRIBUTE, &id.to_string())?;
        Ok(id)
    }

    fn render(&self, id: ToastId, content: &Content, severity: Severity) -> Result<H::Node> {
        let host = &self.host;

        let toast = host.create_element("div")?;
        host.set_class_name(&toast, &format!("{} {}", TOAST_CLASS, severity.class()));
        host.set_attribute(&toast, ID_ATTRIBUTE, &id.to_string())?;

        let icon = host.create_element("span")?;
        host.set_class_name(&icon, "toast-icon");
        host.set_text(&icon, severity.icon());

        let message = host.create_element("span")?;
        host.set_class_name(&message, "toast-message");
        match content {
            Content::Text(text) => host.set_text(&message, text),
            Content::Markup(markup) => host.set_markup(&message, markup),
        }

        host.append(&toast, &icon)?;
        host.append(&toast, &message)?;
        Ok(toast)
    }
}

impl<H: Host> Toast<H> {
    /// Schedules the entrance, the timeout and the click handler. Each holds the
    /// toast until it has run or been released by [`Toast::detach`].
    fn arm(self: &Rc<Self>, duration_ms: u32) -> Result<()> {
        let toast = self.clone();
        self.host.next_frame(Box::new(move || toast.reveal()))?;

        let toast = self.clone();
        let expiry = self.host.schedule(
            duration_ms,
            Box::new(move || {
                log::trace!("toast {} timed out", toast.id);
                toast.begin_hide(false);
            }),
        )?;
        *self.expiry.borrow_mut() = Some(expiry);

        let toast = self.clone();
        let click = self.host.on_click(
            &self.node,
            Box::new(move || {
                log::trace!("toast {} clicked", toast.id);
                toast.begin_hide(true);
            }),
        )?;
        *self.click.borrow_mut() = Some(click);
        Ok(())
    }

    /// Undoes a partially armed toast.
    fn abort(&self) {
        self.phase.set(Phase::Hiding);
        let expiry = self.expiry.borrow_mut().take();
        if let Some(timer) = expiry {
            self.host.cancel(timer);
        }
        let click = self.click.borrow_mut().take();
        drop(click);
        self.host.detach(&self.node);
    }

    fn reveal(&self) {
        // Dismissed before its first frame: never show it.
        if self.phase.get() != Phase::Entering {
            return;
        }
        if let Err(e) = self.host.add_class(&self.node, SHOW_CLASS) {
            log::error!("unable to add {} class to toast {}: {}", SHOW_CLASS, self.id, e)
        }
        self.phase.set(Phase::Shown);
        log::trace!("toast {} shown", self.id);
    }

    /// Single removal path for timeouts, clicks and dismissals. A toast already
    /// hiding or detached is left alone.
    ///
    /// The timeout path must not cancel its own timer, as it runs from within it.
    fn begin_hide(self: &Rc<Self>, cancel_expiry: bool) -> bool {
        if self.phase.get() == Phase::Hiding {
            return false;
        }
        self.phase.set(Phase::Hiding);

        let expiry = if cancel_expiry {
            self.expiry.borrow_mut().take()
        } else {
            None
        };
        if let Some(timer) = expiry {
            self.host.cancel(timer);
        }
        if let Err(e) = self.host.remove_class(&self.node, SHOW_CLASS) {
            log::error!("unable to remove {} class from toast {}: {}", SHOW_CLASS, self.id, e)
        }

        let toast = self.clone();
        let scheduled = self
            .host
            .defer(self.hide_delay_ms, Box::new(move || toast.detach()));
        if let Err(e) = scheduled {
            log::error!("unable to schedule removal of toast {}: {}", self.id, e);
            self.detach();
        }
        log::trace!("toast {} hiding", self.id);
        true
    }

    fn detach(&self) {
        if self.host.has_parent(&self.node) {
            self.host.detach(&self.node);
        }
        // Releases the callbacks holding this toast.
        let click = self.click.borrow_mut().take();
        let expiry = self.expiry.borrow_mut().take();
        drop((click, expiry));
        self.unregister();
        log::debug!("removed toast {}", self.id);
    }

    fn unregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let removed = registry.borrow_mut().remove(&self.id);
            drop(removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::headless::{HeadlessHost, NodeId};
    use crate::host::Host;
    use crate::manager::{Content, ToastHandle, ToastManager};
    use crate::{Config, Result, Severity};

    fn manager() -> (HeadlessHost, ToastManager<HeadlessHost>) {
        let host = HeadlessHost::new();
        let manager = ToastManager::new(host.clone()).expect("could not create manager");
        (host, manager)
    }

    fn toasts(host: &HeadlessHost, manager: &ToastManager<HeadlessHost>) -> Vec<NodeId> {
        host.children(*manager.container())
    }

    fn icon(host: &HeadlessHost, toast: NodeId) -> String {
        host.text_content(host.children(toast)[0])
    }

    fn message(host: &HeadlessHost, toast: NodeId) -> NodeId {
        host.children(toast)[1]
    }

    #[test]
    fn creates_single_container_in_body() {
        let (host, manager) = manager();
        let body = host.body().unwrap();
        assert_eq!(host.children(body), vec![*manager.container()]);
        assert_eq!(host.classes(*manager.container()), vec!["toast-container"]);

        let second = ToastManager::new(host.clone()).expect("could not create manager");
        assert_eq!(second.container(), manager.container());
        assert_eq!(host.find_all_by_class("toast-container").len(), 1);
    }

    #[test]
    fn saved_example_lifecycle() {
        let (host, manager) = manager();
        let toast = manager.success("Saved").unwrap();

        assert_eq!(host.classes(toast.node), vec!["toast", "success"]);
        assert_eq!(icon(&host, toast.node), "✓");
        assert_eq!(host.text_content(message(&host, toast.node)), "Saved");
        assert_eq!(host.attribute(toast.node, "data-toast-id").as_deref(), Some("1"));

        host.frame();
        assert!(host.has_class(toast.node, "show"));

        host.advance(3999);
        assert!(host.has_class(toast.node, "show"));
        host.advance(1);
        assert!(!host.has_class(toast.node, "show"));
        assert!(host.has_parent(&toast.node));
        assert!(!manager.is_visible(toast.id));

        host.advance(399);
        assert!(host.has_parent(&toast.node));
        host.advance(1);
        assert!(!host.has_parent(&toast.node));
        assert!(manager.is_empty());
        assert!(!host.has_listener(toast.node));
    }

    #[test]
    fn renders_expected_markup() {
        let (host, manager) = manager();
        let toast = manager.show("Disk <full>", Severity::Warning, 100).unwrap();
        assert_eq!(
            host.outer_html(toast.node),
            concat!(
                r#"<div class="toast warning" data-toast-id="1">"#,
                r#"<span class="toast-icon">⚠</span>"#,
                r#"<span class="toast-message">Disk &lt;full&gt;</span>"#,
                "</div>"
            )
        );
    }

    #[test]
    fn icons_follow_severity() {
        let (host, manager) = manager();
        for severity in Severity::ALL {
            let toast = manager.show("x", severity, 1000).unwrap();
            assert_eq!(icon(&host, toast.node), severity.icon());
            assert!(host.has_class(toast.node, severity.class()));
        }
    }

    #[test]
    fn unknown_severity_falls_back_to_info() {
        let (host, manager) = manager();
        let toast = manager
            .show("x", Severity::parse_lenient("danger"), 1000)
            .unwrap();
        assert_eq!(icon(&host, toast.node), "ⓘ");
        assert_eq!(host.classes(toast.node), vec!["toast", "info"]);
    }

    #[test]
    fn helper_durations() {
        type Show = fn(&ToastManager<HeadlessHost>, &str) -> Result<ToastHandle<NodeId>>;
        let cases: [(Show, u64); 4] = [
            (ToastManager::success, 4000),
            (ToastManager::error, 7000),
            (ToastManager::warning, 6000),
            (ToastManager::info, 4000),
        ];
        for (show, duration) in cases {
            let (host, manager) = manager();
            let toast = show(&manager, "x").unwrap();
            host.advance(duration - 1);
            assert!(manager.is_visible(toast.id));
            host.advance(1);
            assert!(!manager.is_visible(toast.id));
        }
    }

    #[test]
    fn show_default_uses_info_for_five_seconds() {
        let (host, manager) = manager();
        let toast = manager.show_default("hello").unwrap();
        assert!(host.has_class(toast.node, "info"));
        host.advance(4999);
        assert!(manager.is_visible(toast.id));
        host.advance(1);
        assert!(!manager.is_visible(toast.id));
    }

    #[test]
    fn ids_strictly_increase() {
        let (host, manager) = manager();
        let mut last = 0;
        for _ in 0..5 {
            let toast = manager.info("x").unwrap();
            assert!(toast.id > last);
            last = toast.id;
        }
        host.advance(10_000);
        assert!(manager.is_empty());
        assert!(manager.info("again").unwrap().id > last);
    }

    #[test]
    fn toasts_stack_in_order() {
        let (host, manager) = manager();
        let first = manager.info("one").unwrap();
        let second = manager.error("two").unwrap();
        assert_eq!(toasts(&host, &manager), vec![first.node, second.node]);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn click_cancels_timeout() {
        let (host, manager) = manager();
        let toast = manager.info_for("x", 1000).unwrap();
        host.frame();
        let pending = host.pending_timers();

        assert!(host.click(toast.node));
        assert!(!host.has_class(toast.node, "show"));
        // The timeout is replaced by the detach timer.
        assert_eq!(host.pending_timers(), pending);

        host.advance(400);
        assert!(toasts(&host, &manager).is_empty());
        assert_eq!(host.advance(10_000), 0);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn second_click_while_hiding_does_nothing() {
        let (host, manager) = manager();
        let toast = manager.info("x").unwrap();
        host.click(toast.node);
        let html = host.outer_html(*manager.container());
        let pending = host.pending_timers();

        host.click(toast.node);
        assert_eq!(host.outer_html(*manager.container()), html);
        assert_eq!(host.pending_timers(), pending);
    }

    #[test]
    fn removal_is_idempotent() {
        let (host, manager) = manager();
        let toast = manager.info("x").unwrap();
        assert!(manager.dismiss(toast.id));
        let html = host.outer_html(*manager.container());
        assert!(!manager.dismiss(toast.id));
        assert_eq!(host.outer_html(*manager.container()), html);

        host.advance(400);
        assert!(!manager.contains(toast.id));
        assert!(!manager.dismiss(toast.id));
    }

    #[test]
    fn timeout_after_manual_detach_is_harmless() {
        let (host, manager) = manager();
        let toast = manager.info_for("x", 1000).unwrap();
        host.detach(&toast.node);
        host.advance(1000);
        host.advance(400);
        assert!(manager.is_empty());
        assert!(!host.has_parent(&toast.node));
    }

    #[test]
    fn dismissed_before_first_frame_never_shows() {
        let (host, manager) = manager();
        let toast = manager.info("x").unwrap();
        manager.dismiss(toast.id);
        host.frame();
        assert!(!host.has_class(toast.node, "show"));
    }

    #[test]
    fn clear_removes_everything() {
        let (host, manager) = manager();
        for severity in Severity::ALL {
            manager.show("x", severity, 60_000).unwrap();
        }
        host.frame();
        let hiding = manager.info("y").unwrap();
        manager.dismiss(hiding.id);

        manager.clear();
        assert_eq!(manager.len(), 5);
        assert_eq!(toasts(&host, &manager).len(), 5);
        host.advance(400);
        assert!(toasts(&host, &manager).is_empty());
        assert!(manager.is_empty());
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn markup_content_is_inserted_raw() {
        let (host, manager) = manager();
        let toast = manager
            .show_content(
                Content::Markup("<b>Saved</b>".to_string()),
                Severity::Success,
                1000,
            )
            .unwrap();
        assert_eq!(host.inner_html(message(&host, toast.node)), "<b>Saved</b>");
    }

    #[test]
    fn custom_config_is_honoured() {
        let host = HeadlessHost::new();
        let config = Config::from_json(
            r#"{
                "container_class": "notices",
                "hide_delay_ms": 100,
                "durations": { "success": 50 }
            }"#,
        )
        .unwrap();
        let manager = ToastManager::with_config(host.clone(), config).unwrap();
        assert!(host.has_class(*manager.container(), "notices"));

        let toast = manager.success("x").unwrap();
        host.advance(50);
        assert!(!manager.is_visible(toast.id));
        host.advance(100);
        assert!(!host.has_parent(&toast.node));
    }

    #[test]
    fn toasts_outlive_their_manager() {
        let host = HeadlessHost::new();
        let toast = {
            let manager = ToastManager::new(host.clone()).unwrap();
            manager.success_for("Saved", 1000).unwrap()
        };

        host.frame();
        assert!(host.has_class(toast.node, "show"));
        host.advance(1000);
        assert!(!host.has_class(toast.node, "show"));
        host.advance(400);
        assert!(!host.has_parent(&toast.node));
        assert!(!host.has_listener(toast.node));
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn click_still_works_after_manager_is_dropped() {
        let (host, manager) = manager();
        let toast = manager.info("x").unwrap();
        drop(manager);

        assert!(host.click(toast.node));
        host.advance(400);
        assert!(!host.has_parent(&toast.node));
        assert_eq!(host.advance(60_000), 0);
    }

    #[test]
    fn clear_empties_container_shared_with_another_manager() {
        let (host, first) = manager();
        let second = ToastManager::new(host.clone()).unwrap();
        first.info("mine").unwrap();
        let theirs = second.info("theirs").unwrap();
        host.frame();

        first.clear();
        assert!(!second.is_visible(theirs.id));
        host.advance(400);
        assert!(toasts(&host, &first).is_empty());
        assert!(first.is_empty());
        assert!(second.is_empty());
        // The other manager's timeout was cancelled along the way.
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn ids_are_unique_across_managers() {
        let (host, first) = manager();
        let second = ToastManager::new(host.clone()).unwrap();
        let a = first.info("a").unwrap();
        let b = second.info("b").unwrap();
        let c = first.info("c").unwrap();
        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
        assert_eq!(host.attribute(b.node, "data-toast-id").as_deref(), Some("2"));

        drop(first);
        drop(second);
        let third = ToastManager::new(host.clone()).unwrap();
        assert_eq!(third.info("d").unwrap().id, 4);
    }

    #[test]
    fn dismiss_node_only_accepts_own_toasts() {
        let (host, first) = manager();
        let second = ToastManager::new(host.clone()).unwrap();
        let mine = first.info("mine").unwrap();
        let theirs = second.info("theirs").unwrap();

        let forged = host.create_element("div").unwrap();
        host.set_attribute(&forged, "data-toast-id", &mine.id.to_string())
            .unwrap();
        assert!(!first.dismiss_node(&forged));
        assert!(!first.dismiss_node(&theirs.node));
        assert!(first.is_visible(mine.id));
        assert!(second.is_visible(theirs.id));

        assert!(first.dismiss_node(&mine.node));
        assert!(!first.dismiss_node(&mine.node));
        assert!(second.dismiss_node(&theirs.node));
    }
}
