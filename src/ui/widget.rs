//! Headless widget tree
//!
//! Controls build their visuals out of these nodes. A front end renders them;
//! the panel core only needs the structure, the tooltips and the signal
//! handlers, so nothing here draws anything.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::icons::Icon;

/// Signals a widget can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Any pointer button went down over the widget
    ButtonPress,
    /// Primary activation of a button
    Clicked,
    /// Items were dropped onto the widget
    Drop,
}

/// Event payload delivered to signal handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ButtonPress { button: u32 },
    Clicked,
    /// Paths or URIs of the dropped items, in drop order
    Drop { items: Vec<String> },
}

impl Event {
    #[must_use]
    pub fn signal(&self) -> Signal {
        match self {
            Self::ButtonPress { .. } => Signal::ButtonPress,
            Self::Clicked => Signal::Clicked,
            Self::Drop { .. } => Signal::Drop,
        }
    }
}

pub type Callback = Rc<dyn Fn(&Event)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetKind {
    /// Flat button showing only an icon
    IconButton,
    Button { label: String },
    Label { text: String },
    Image,
    /// Horizontal box holding other widgets
    HBox,
}

pub struct Widget {
    pub kind: WidgetKind,
    pub icon: Option<Icon>,
    pub tooltip: Option<String>,
    pub sensitive: bool,
    pub children: Vec<WidgetRef>,
    handlers: Vec<(Signal, Callback)>,
}

pub type WidgetRef = Rc<RefCell<Widget>>;

impl Widget {
    #[must_use]
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            icon: None,
            tooltip: None,
            sensitive: true,
            children: Vec::new(),
            handlers: Vec::new(),
        }
    }

    #[must_use]
    pub fn icon_button(icon: Icon) -> Self {
        let mut widget = Self::new(WidgetKind::IconButton);
        widget.icon = Some(icon);
        widget
    }

    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::new(WidgetKind::Label { text: text.into() })
    }

    #[must_use]
    pub fn into_ref(self) -> WidgetRef {
        Rc::new(RefCell::new(self))
    }

    pub fn set_icon(&mut self, icon: Icon) {
        self.icon = Some(icon);
    }

    pub fn set_tooltip(&mut self, text: impl Into<String>) {
        self.tooltip = Some(text.into());
    }

    pub fn connect(&mut self, signal: Signal, callback: Callback) {
        self.handlers.push((signal, callback));
    }

    /// Deliver `event` to every handler connected for its signal
    ///
    /// The widget is not borrowed while handlers run, so a handler may
    /// update the widget that emitted the event.
    pub fn emit(widget: &WidgetRef, event: &Event) {
        let signal = event.signal();
        let handlers: Vec<Callback> = widget
            .borrow()
            .handlers
            .iter()
            .filter(|(s, _)| *s == signal)
            .map(|(_, cb)| cb.clone())
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("kind", &self.kind)
            .field("icon", &self.icon)
            .field("tooltip", &self.tooltip)
            .field("sensitive", &self.sensitive)
            .field("children", &self.children)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Root container every panel control is packed into
///
/// Holds at most one child, like an event box.
#[derive(Default)]
pub struct ControlBase {
    child: Option<WidgetRef>,
    size_request: Option<(u32, u32)>,
    handlers: Vec<(Signal, Callback)>,
}

impl ControlBase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_child(&mut self, child: WidgetRef) {
        self.child = Some(child);
    }

    #[must_use]
    pub fn child(&self) -> Option<&WidgetRef> {
        self.child.as_ref()
    }

    pub fn set_size_request(&mut self, width: u32, height: u32) {
        self.size_request = Some((width, height));
    }

    #[must_use]
    pub fn size_request(&self) -> Option<(u32, u32)> {
        self.size_request
    }

    pub fn connect(&mut self, signal: Signal, callback: Callback) {
        self.handlers.push((signal, callback));
    }

    /// Deliver `event` to the container's own handlers
    pub fn emit(&self, event: &Event) {
        let signal = event.signal();
        for (s, handler) in &self.handlers {
            if *s == signal {
                handler(event);
            }
        }
    }

    /// Drop the child and every handler, leaving an empty container
    pub fn clear(&mut self) {
        self.child = None;
        self.size_request = None;
        self.handlers.clear();
    }
}

impl fmt::Debug for ControlBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBase")
            .field("child", &self.child)
            .field("size_request", &self.size_request)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Page of the control configuration dialog
///
/// `revert` starts insensitive; a control makes it sensitive once an option
/// changes and connects a handler that restores the initial values. `done`
/// closes the dialog, so anything not applied immediately is applied then.
#[derive(Debug)]
pub struct OptionsPage {
    pub container: Vec<WidgetRef>,
    pub revert: WidgetRef,
    pub done: WidgetRef,
}

impl OptionsPage {
    #[must_use]
    pub fn new() -> Self {
        let mut revert = Widget::new(WidgetKind::Button {
            label: "Revert".to_string(),
        });
        revert.sensitive = false;

        Self {
            container: Vec::new(),
            revert: revert.into_ref(),
            done: Widget::new(WidgetKind::Button {
                label: "Done".to_string(),
            })
            .into_ref(),
        }
    }

    pub fn add(&mut self, widget: WidgetRef) {
        self.container.push(widget);
    }
}

impl Default for OptionsPage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_only_matching_signal() {
        let widget = Widget::new(WidgetKind::IconButton).into_ref();
        let clicks = Rc::new(Cell::new(0));

        let counter = clicks.clone();
        widget
            .borrow_mut()
            .connect(Signal::Clicked, Rc::new(move |_: &Event| counter.set(counter.get() + 1)));

        Widget::emit(&widget, &Event::Clicked);
        Widget::emit(&widget, &Event::ButtonPress { button: 1 });

        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_handler_can_mutate_emitter() {
        let widget = Widget::new(WidgetKind::IconButton).into_ref();
        let weak = Rc::downgrade(&widget);
        widget.borrow_mut().connect(
            Signal::Clicked,
            Rc::new(move |_: &Event| {
                if let Some(w) = weak.upgrade() {
                    w.borrow_mut().set_tooltip("clicked");
                }
            }),
        );

        Widget::emit(&widget, &Event::Clicked);
        assert_eq!(widget.borrow().tooltip.as_deref(), Some("clicked"));
    }

    #[test]
    fn test_control_base_clear() {
        let mut base = ControlBase::new();
        base.set_child(Widget::label("x").into_ref());
        base.set_size_request(10, 10);
        base.connect(Signal::ButtonPress, Rc::new(|_: &Event| {}));

        base.clear();
        assert!(base.child().is_none());
        assert!(base.size_request().is_none());
    }

    #[test]
    fn test_options_page_revert_starts_insensitive() {
        let page = OptionsPage::new();
        assert!(!page.revert.borrow().sensitive);
        assert!(page.done.borrow().sensitive);
    }
}
