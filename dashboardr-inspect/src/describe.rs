//! Short element labels for terminal output

use dashboardr::dom::{DomSnapshot, NodeId};

/// `div#id.class-a.class-b`, or the tag alone.
pub fn describe(doc: &DomSnapshot, node: NodeId) -> String {
    let el = doc.get(node);
    let mut label = el.tag.clone();
    if let Some(id) = el.element_id() {
        label.push('#');
        label.push_str(id);
    }
    for class in &el.classes {
        label.push('.');
        label.push_str(class);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboardr::dom::Element;

    #[test]
    fn label_includes_id_and_classes() {
        let mut doc = DomSnapshot::new();
        let root = doc.root();
        let card = doc.append(root, Element::new("DIV").id("c1").class("card shadow"));
        let plain = doc.append(root, Element::new("span"));
        assert_eq!(describe(&doc, card), "div#c1.card.shadow");
        assert_eq!(describe(&doc, plain), "span");
    }
}
