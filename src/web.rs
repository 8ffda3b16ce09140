use crate::host::{Callback, Handler, Host};
use crate::{Error, Result};
use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, Window};

/// The browser page: real DOM, `setTimeout` and `requestAnimationFrame`.
#[derive(Clone)]
pub struct WebHost {
    window: Window,
    document: Document,
}

impl WebHost {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or(Error::NoWindow)?;
        let document = window.document().ok_or(Error::NoDocument)?;
        Ok(Self { window, document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// A click listener attached to a toast element, removed again on drop.
pub struct ClickListener {
    target: Element,
    listener: Closure<dyn FnMut(Event)>,
}

impl Drop for ClickListener {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback("click", self.listener.as_ref().unchecked_ref())
        {
            log::error!("unable to remove click event listener from toast: {:?}", e)
        }
    }
}

/// Browsers store timeouts as signed 32-bit values; longer delays would wrap negative and
/// fire immediately.
fn clamp_delay(delay_ms: u32) -> u32 {
    delay_ms.min(i32::MAX as u32)
}

fn millis(delay_ms: u32) -> i32 {
    i32::try_from(clamp_delay(delay_ms)).unwrap_or(i32::MAX)
}

impl Host for WebHost {
    type Node = Element;
    type Timer = Timeout;
    type Listener = ClickListener;

    fn body(&self) -> Result<Element> {
        self.document.body().map(Element::from).ok_or(Error::NoBody)
    }

    fn find_by_class(&self, class: &str) -> Option<Element> {
        match self.document.query_selector(&format!(".{}", class)) {
            Ok(element) => element,
            Err(e) => {
                log::error!("unable to query .{}: {:?}", class, e);
                None
            }
        }
    }

    fn create_element(&self, tag: &str) -> Result<Element> {
        Ok(self.document.create_element(tag)?)
    }

    fn set_class_name(&self, node: &Element, classes: &str) {
        node.set_class_name(classes)
    }

    fn add_class(&self, node: &Element, class: &str) -> Result<()> {
        Ok(node.class_list().add_1(class)?)
    }

    fn remove_class(&self, node: &Element, class: &str) -> Result<()> {
        Ok(node.class_list().remove_1(class)?)
    }

    fn get_attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<()> {
        Ok(node.set_attribute(name, value)?)
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text))
    }

    fn set_markup(&self, node: &Element, markup: &str) {
        node.set_inner_html(markup)
    }

    fn append(&self, parent: &Element, child: &Element) -> Result<()> {
        parent.append_child(child)?;
        Ok(())
    }

    fn children_by_class(&self, node: &Element, class: &str) -> Vec<Element> {
        let children = node.children();
        (0..children.length())
            .filter_map(|index| children.item(index))
            .filter(|child| child.class_list().contains(class))
            .collect()
    }

    fn has_parent(&self, node: &Element) -> bool {
        node.parent_node().is_some()
    }

    fn detach(&self, node: &Element) {
        node.remove()
    }

    fn on_click(&self, node: &Element, mut handler: Handler) -> Result<ClickListener> {
        let listener =
            Closure::wrap(Box::new(move |_event: Event| handler()) as Box<dyn FnMut(Event)>);
        node.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;
        Ok(ClickListener {
            target: node.clone(),
            listener,
        })
    }

    fn dispatch_click(&self, node: &Element) -> Result<()> {
        let event = Event::new("click")?;
        node.dispatch_event(&event)?;
        Ok(())
    }

    fn next_frame(&self, callback: Callback) -> Result<()> {
        let callback = Closure::once_into_js(move || callback());
        self.window
            .request_animation_frame(callback.unchecked_ref())?;
        Ok(())
    }

    fn schedule(&self, delay_ms: u32, callback: Callback) -> Result<Timeout> {
        Ok(Timeout::new(clamp_delay(delay_ms), move || callback()))
    }

    fn cancel(&self, timer: Timeout) {
        // Dropping a gloo timeout clears it.
        drop(timer)
    }

    fn defer(&self, delay_ms: u32, callback: Callback) -> Result<()> {
        let callback = Closure::once_into_js(move || callback());
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                millis(delay_ms),
            )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::web::{clamp_delay, millis};

    #[test]
    fn clamps_delays_beyond_browser_range() {
        assert_eq!(clamp_delay(4000), 4000);
        assert_eq!(clamp_delay(u32::MAX), i32::MAX as u32);
        assert_eq!(millis(u32::MAX), i32::MAX);
        assert_eq!(millis(400), 400);
    }
}
