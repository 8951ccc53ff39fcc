//! End-to-end behaviour of the runtime over an in-memory page.

use std::time::Duration;

use dashboardr_runtime::a11y::ModalState;
use dashboardr_runtime::config::RuntimeConfig;
use dashboardr_runtime::dom::{DomSnapshot, Element, NodeId};
use dashboardr_runtime::events::{Event, Key};
use dashboardr_runtime::runtime::Runtime;
use dashboardr_runtime::schedule::ManualScheduler;

const HIDDEN: &str = "dashboardr-hidden";

struct Page {
    doc: DomSnapshot,
    sched: ManualScheduler,
    runtime: Runtime<DomSnapshot>,
}

impl Page {
    fn start(doc: DomSnapshot) -> Self {
        let mut page = Page {
            doc,
            sched: ManualScheduler::new(),
            runtime: Runtime::new(RuntimeConfig::default()),
        };
        page.runtime.init(&mut page.doc, &mut page.sched);
        page
    }

    fn change(&mut self, control: NodeId, value: &str) {
        self.doc.set_value(control, value);
        self.runtime.handle(
            Event::Change {
                target: Some(control),
            },
            &mut self.doc,
            &mut self.sched,
        );
    }

    fn hidden(&self, node: NodeId) -> bool {
        self.doc.has_class(node, HIDDEN)
    }

    fn key(&mut self, key: Key, shift: bool) -> bool {
        let Some(target) = self.doc.active() else {
            return false;
        };
        self.runtime
            .handle(Event::KeyDown { target, key, shift }, &mut self.doc, &mut self.sched)
            .prevent_default
    }

    /// Tab press, falling back to document-order traversal like a browser.
    fn tab(&mut self, shift: bool) {
        if self.key(Key::Tab, shift) {
            return;
        }
        let order = self.doc.focusables();
        let Some(current) = self.doc.active().and_then(|a| order.iter().position(|n| *n == a))
        else {
            return;
        };
        let next = if shift {
            current.checked_sub(1)
        } else {
            Some(current + 1).filter(|i| *i < order.len())
        };
        if let Some(next) = next {
            self.doc.set_active(Some(order[next]));
        }
    }

    fn advance(&mut self, by: Duration) {
        self.runtime.advance(&mut self.doc, &mut self.sched, by);
    }
}

fn show_when(doc: &mut DomSnapshot, parent: NodeId, condition: &str) -> NodeId {
    doc.append(parent, Element::new("div").attr("data-show-when", condition))
}

#[test]
fn equality_condition_follows_select() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let select = doc.append(
        root,
        Element::new("select")
            .attr("data-filter-var", "degree")
            .value("graduate"),
    );
    let target = show_when(&mut doc, root, r#"{"var":"degree","op":"eq","val":"graduate"}"#);

    let mut page = Page::start(doc);
    assert!(!page.hidden(target));
    page.change(select, "bachelor's");
    assert!(page.hidden(target));
}

#[test]
fn numeric_range_with_and() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let age = doc.append(root, Element::new("select").id("age").value("25"));
    let target = show_when(
        &mut doc,
        root,
        r#"{"op":"and","conditions":[
            {"var":"age","op":"gte","val":"18"},
            {"var":"age","op":"lt","val":"30"}]}"#,
    );

    let mut page = Page::start(doc);
    assert!(!page.hidden(target));
    page.change(age, "17");
    assert!(page.hidden(target));
    page.change(age, "abc");
    assert!(page.hidden(target));
    page.change(age, "29.5");
    assert!(!page.hidden(target));
}

#[test]
fn membership_condition_follows_radio_group() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let group = doc.append(root, Element::new("div").attr("data-filter-var", "country"));
    let radios: Vec<NodeId> = ["US", "DE", "FR"]
        .into_iter()
        .map(|value| {
            doc.append(
                group,
                Element::new("input")
                    .attr("type", "radio")
                    .attr("name", "country_choice")
                    .attr("value", value)
                    .checked(value == "DE"),
            )
        })
        .collect();
    let target = show_when(&mut doc, root, r#"{"var":"country","op":"in","val":["US","DE"]}"#);

    let mut page = Page::start(doc);
    assert!(!page.hidden(target));

    page.doc.check_radio(radios[2]);
    page.runtime.handle(
        Event::Change {
            target: Some(radios[2]),
        },
        &mut page.doc,
        &mut page.sched,
    );
    assert!(page.hidden(target));
}

#[test]
fn card_hides_once_every_member_is_hidden() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let select = doc.append(root, Element::new("select").id("wave").value("1"));
    let grid = doc.append(root, Element::new("div").class("bslib-grid"));
    let card = doc.append(grid, Element::new("div").class("card"));
    let body = doc.append(card, Element::new("div").class("card-body"));
    let members = [
        show_when(&mut doc, body, r#"{"var":"wave","op":"eq","val":"2"}"#),
        show_when(&mut doc, body, r#"{"var":"wave","op":"eq","val":"3"}"#),
        show_when(&mut doc, body, r#"{"var":"wave","op":"neq","val":"3"}"#),
    ];

    let mut page = Page::start(doc);
    assert!(page.hidden(members[0]));
    assert!(page.hidden(members[1]));
    assert!(!page.hidden(members[2]));
    assert!(!page.hidden(card));
    assert!(!page.hidden(grid));

    page.change(select, "3");
    assert!(!page.hidden(members[1]));
    assert!(page.hidden(members[2]));
    assert!(!page.hidden(card));

    let config = page.runtime.config().clone();
    page.doc.get_mut(members[1]).attrs.insert(
        config.show_when_attr,
        r#"{"var":"wave","op":"eq","val":"4"}"#.to_string(),
    );
    page.runtime.reevaluate(&mut page.doc);
    assert!(members.iter().all(|m| page.hidden(*m)));
    assert!(page.hidden(card));
    assert!(page.hidden(grid));

    page.change(select, "2");
    assert!(!page.hidden(card));
    assert!(!page.hidden(grid));
}

#[test]
fn modal_traps_and_restores_focus() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let open_btn = doc.append(root, Element::new("button").id("open-btn"));
    doc.append(root, Element::new("a").attr("href", "#before"));
    let overlay = doc.append(
        root,
        Element::new("div")
            .id("dashboardr-modal-overlay")
            .attr("style", "display:none"),
    );
    let close = doc.append(overlay, Element::new("button").class("dashboardr-modal-close"));
    let field = doc.append(overlay, Element::new("input").attr("type", "text"));
    doc.append(overlay, Element::new("button").attr("disabled", ""));
    let link = doc.append(overlay, Element::new("a").attr("href", "#details"));
    doc.append(root, Element::new("a").attr("href", "#after"));
    doc.set_active(Some(open_btn));

    let mut page = Page::start(doc);
    page.doc.get_mut(overlay).attrs.insert("style".into(), "display:flex".into());
    page.runtime.handle(
        Event::OverlayStyleChanged { visible: true },
        &mut page.doc,
        &mut page.sched,
    );
    assert_eq!(page.runtime.focus_trap().state(), ModalState::Open);

    page.advance(Duration::from_millis(100));
    assert_eq!(page.doc.active(), Some(close));

    let mut visited = Vec::new();
    for _ in 0..7 {
        page.tab(false);
        visited.push(page.doc.active());
    }
    let cycle = [Some(field), Some(link), Some(close)];
    assert_eq!(visited[..3], cycle);
    assert_eq!(visited[3..6], cycle);

    page.doc.set_active(Some(close));
    page.tab(true);
    assert_eq!(page.doc.active(), Some(link));

    page.doc.get_mut(overlay).attrs.insert("style".into(), "display:none".into());
    page.runtime.handle(
        Event::OverlayStyleChanged { visible: false },
        &mut page.doc,
        &mut page.sched,
    );
    assert_eq!(page.doc.active(), Some(open_btn));
    assert_eq!(page.runtime.focus_trap().previous(), None);
}

#[test]
fn arrow_left_on_first_tab_wraps_to_last() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let list = doc.append(root, Element::new("ul").class("nav nav-tabs").attr("role", "tablist"));
    let tabs: Vec<NodeId> = (0..4)
        .map(|i| {
            doc.append(
                list,
                Element::new("a")
                    .attr("role", "tab")
                    .attr("href", &format!("#panel-{i}")),
            )
        })
        .collect();
    doc.set_active(Some(tabs[0]));

    let mut page = Page::start(doc);
    assert!(page.key(Key::ArrowLeft, false));
    assert_eq!(page.doc.active(), Some(tabs[3]));
    assert_eq!(page.doc.clicks(), &[tabs[3]]);

    assert!(page.key(Key::Home, false));
    assert_eq!(page.doc.active(), Some(tabs[0]));
    assert!(!page.key(Key::Other, false));
}

#[test]
fn filter_burst_announces_once() {
    let mut doc = DomSnapshot::new();
    let root = doc.root();
    let select = doc.append(root, Element::new("select").id("region").value("north"));

    let mut page = Page::start(doc);
    let config = page.runtime.config().clone();
    for value in ["south", "east", "west"] {
        page.change(select, value);
        page.advance(Duration::from_millis(200));
    }
    assert_eq!(page.doc.live_text(&config), None);

    page.advance(Duration::from_millis(300));
    page.advance(Duration::from_millis(20));
    assert_eq!(page.doc.live_text(&config), Some("Filters updated"));

    page.runtime.teardown(&mut page.sched);
    assert_eq!(page.sched.pending(), 0);
}
