//! DOM utilities over `scraper::Html`.
//!
//! Reads go through `scraper` selectors; mutations go through the underlying
//! `ego_tree::Tree<Node>`. Callers collect `NodeId`s first, then mutate, so
//! immutable borrows never overlap tree edits.

use ego_tree::{NodeId, Tree};
use html5ever::tendril::StrTendril;
use html5ever::{namespace_url, ns, Attribute, LocalName, QualName};
use scraper::node::{Element, Node, Text};
use scraper::{ElementRef, Html, Selector};

/// Canonical stable-identifier attribute stamped onto nodes by the
/// conversion/audit steps.
pub const ELEMENT_ID_ATTR: &str = "data-element-id";
/// Legacy spelling, accepted read-only for documents produced by older runs.
pub const LEGACY_ELEMENT_ID_ATTR: &str = "element-data-id";

pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

pub fn parse_fragment(html: &str) -> Html {
    Html::parse_fragment(html)
}

pub fn serialize(doc: &Html) -> String {
    doc.html()
}

fn elem_name(tag: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(tag))
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name))
}

/// Parse a selector, treating invalid selector strings as non-matching
/// rather than fatal. Audit-produced paths are untrusted input.
pub fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

pub fn select_one(doc: &Html, selector_str: &str) -> Option<NodeId> {
    let sel = selector(selector_str)?;
    doc.select(&sel).next().map(|e| e.id())
}

pub fn select_all(doc: &Html, selector_str: &str) -> Vec<NodeId> {
    match selector(selector_str) {
        Some(sel) => doc.select(&sel).map(|e| e.id()).collect(),
        None => Vec::new(),
    }
}

pub fn element_ref(doc: &Html, id: NodeId) -> Option<ElementRef<'_>> {
    doc.tree.get(id).and_then(ElementRef::wrap)
}

pub fn tag_name(doc: &Html, id: NodeId) -> Option<String> {
    element_ref(doc, id).map(|e| e.value().name().to_string())
}

pub fn get_attr(doc: &Html, id: NodeId, name: &str) -> Option<String> {
    element_ref(doc, id).and_then(|e| e.value().attr(name).map(str::to_string))
}

/// Set or replace an attribute. Returns false if the node is not an element.
pub fn set_attr(tree: &mut Tree<Node>, id: NodeId, name: &str, value: &str) -> bool {
    let Some(mut node) = tree.get_mut(id) else {
        return false;
    };
    match node.value() {
        Node::Element(el) => {
            el.attrs.insert(attr_name(name), StrTendril::from(value));
            true
        }
        _ => false,
    }
}

/// The node's stable element id: canonical attribute first, then legacy.
pub fn stable_id(doc: &Html, id: NodeId) -> Option<String> {
    get_attr(doc, id, ELEMENT_ID_ATTR).or_else(|| get_attr(doc, id, LEGACY_ELEMENT_ID_ATTR))
}

/// Stamp the canonical stable id on a node and every `img` beneath it, so
/// later locator calls still resolve after this subtree is restructured.
pub fn stamp_stable_id(doc: &mut Html, root: NodeId, element_id: &str) {
    let mut targets = Vec::new();
    if let Some(node) = doc.tree.get(root) {
        if node.value().as_element().is_some_and(|e| e.name() == "img") {
            targets.push(root);
        }
        for desc in node.descendants() {
            if desc.value().as_element().is_some_and(|e| e.name() == "img") {
                targets.push(desc.id());
            }
        }
    }
    for id in targets {
        set_attr(&mut doc.tree, id, ELEMENT_ID_ATTR, element_id);
    }
}

/// Create a detached element node; the caller attaches it.
pub fn create_element(tree: &mut Tree<Node>, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
    let attributes = attrs
        .iter()
        .map(|(k, v)| Attribute {
            name: attr_name(k),
            value: StrTendril::from(*v),
        })
        .collect();
    tree.orphan(Node::Element(Element::new(elem_name(tag), attributes)))
        .id()
}

pub fn create_text(tree: &mut Tree<Node>, text: &str) -> NodeId {
    tree.orphan(Node::Text(Text {
        text: StrTendril::from(text),
    }))
    .id()
}

/// Rename an element in place (e.g. `td` to `th`), keeping attributes and
/// children.
pub fn rename_element(tree: &mut Tree<Node>, id: NodeId, new_tag: &str) -> bool {
    let Some(mut node) = tree.get_mut(id) else {
        return false;
    };
    match node.value() {
        Node::Element(el) => {
            el.name = elem_name(new_tag);
            true
        }
        _ => false,
    }
}

/// Deep-copy a subtree from one tree into another, returning the detached
/// copy's root in `dst`.
pub fn copy_subtree(src: &Tree<Node>, src_id: NodeId, dst: &mut Tree<Node>) -> Option<NodeId> {
    let src_node = src.get(src_id)?;
    let new_id = dst.orphan(src_node.value().clone()).id();
    let child_ids: Vec<NodeId> = src_node.children().map(|c| c.id()).collect();
    for child in child_ids {
        if let Some(copied) = copy_subtree(src, child, dst) {
            if let Some(mut parent) = dst.get_mut(new_id) {
                parent.append_id(copied);
            }
        }
    }
    Some(new_id)
}

/// Parse markup and import its top-level nodes into `doc` as detached copies,
/// in order. The caller positions them.
pub fn import_fragment(doc: &mut Html, markup: &str) -> Vec<NodeId> {
    let fragment = Html::parse_fragment(markup);
    let Some(root) = fragment.tree.root().children().find(|n| n.value().is_element()) else {
        return Vec::new();
    };
    let child_ids: Vec<NodeId> = root.children().map(|c| c.id()).collect();
    child_ids
        .into_iter()
        .filter_map(|id| copy_subtree(&fragment.tree, id, &mut doc.tree))
        .collect()
}

/// Wrap `target` in a new element: the wrapper takes target's place and
/// target becomes its child.
pub fn wrap_node(
    tree: &mut Tree<Node>,
    target: NodeId,
    tag: &str,
    attrs: &[(&str, &str)],
) -> Option<NodeId> {
    tree.get(target)?.parent()?;
    let wrapper = create_element(tree, tag, attrs);
    tree.get_mut(target)?.insert_id_before(wrapper);
    tree.get_mut(wrapper)?.append_id(target);
    Some(wrapper)
}

/// Replace `target` (tag included) with the given markup's top-level nodes.
pub fn replace_with_fragment(doc: &mut Html, target: NodeId, markup: &str) -> Vec<NodeId> {
    let imported = import_fragment(doc, markup);
    if imported.is_empty() {
        return imported;
    }
    for &id in &imported {
        if let Some(mut node) = doc.tree.get_mut(target) {
            node.insert_id_before(id);
        }
    }
    if let Some(mut node) = doc.tree.get_mut(target) {
        node.detach();
    }
    imported
}

/// Replace `target`'s children with the given markup.
pub fn set_inner_fragment(doc: &mut Html, target: NodeId, markup: &str) -> Vec<NodeId> {
    let existing: Vec<NodeId> = match doc.tree.get(target) {
        Some(node) => node.children().map(|c| c.id()).collect(),
        None => return Vec::new(),
    };
    for id in existing {
        if let Some(mut child) = doc.tree.get_mut(id) {
            child.detach();
        }
    }
    let imported = import_fragment(doc, markup);
    for &id in &imported {
        if let Some(mut node) = doc.tree.get_mut(target) {
            node.append_id(id);
        }
    }
    imported
}

/// Clone one element into a standalone fragment so it can be restructured
/// off-tree, then swapped back in as a single replacement.
pub fn clone_element(doc: &Html, id: NodeId) -> Option<(Html, NodeId)> {
    let markup = element_ref(doc, id)?.html();
    let fragment = Html::parse_fragment(&markup);
    let node = fragment
        .root_element()
        .children()
        .find(|n| n.value().is_element())?
        .id();
    Some((fragment, node))
}

pub fn inner_text(doc: &Html, id: NodeId) -> String {
    element_ref(doc, id)
        .map(|e| e.text().collect::<String>())
        .unwrap_or_default()
}

/// NodeIds of `target`'s descendants matching a selector.
pub fn select_within(doc: &Html, target: NodeId, selector_str: &str) -> Vec<NodeId> {
    let Some(sel) = selector(selector_str) else {
        return Vec::new();
    };
    match element_ref(doc, target) {
        Some(root) => root.select(&sel).map(|e| e.id()).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_and_get_attr() {
        let mut doc = parse_document("<html><body><img src=\"a.png\"></body></html>");
        let img = select_one(&doc, "img").unwrap();
        assert!(set_attr(&mut doc.tree, img, "alt", "a chart"));
        assert_eq!(get_attr(&doc, img, "alt").as_deref(), Some("a chart"));
        assert!(serialize(&doc).contains("alt=\"a chart\""));
    }

    #[test]
    fn test_wrap_node_reparents() {
        let mut doc = parse_document("<html><body><p><img src=\"a.png\"></p></body></html>");
        let img = select_one(&doc, "img").unwrap();
        let figure = wrap_node(&mut doc.tree, img, "figure", &[]).unwrap();
        assert_eq!(tag_name(&doc, figure).as_deref(), Some("figure"));
        // img is now inside the figure, which sits where the img was
        let located = select_one(&doc, "figure > img").unwrap();
        assert_eq!(located, img);
    }

    #[test]
    fn test_import_fragment_grafts_copy() {
        let mut doc = parse_document("<html><body></body></html>");
        let body = select_one(&doc, "body").unwrap();
        let nodes = import_fragment(&mut doc, "<figure><img src=\"x.png\"></figure>");
        assert_eq!(nodes.len(), 1);
        doc.tree.get_mut(body).unwrap().append_id(nodes[0]);
        assert!(select_one(&doc, "body > figure > img").is_some());
    }

    #[test]
    fn test_replace_with_fragment() {
        let mut doc = parse_document("<html><body><img src=\"a.png\"></body></html>");
        let img = select_one(&doc, "img").unwrap();
        replace_with_fragment(
            &mut doc,
            img,
            "<figure><img src=\"a.png\" alt=\"x\"><figcaption>c</figcaption></figure>",
        );
        assert!(select_one(&doc, "body > figure > figcaption").is_some());
        assert_eq!(select_all(&doc, "img").len(), 1);
    }

    #[test]
    fn test_set_inner_fragment_replaces_children() {
        let mut doc = parse_document("<html><body><div id=\"d\"><span>old</span></div></body></html>");
        let div = select_one(&doc, "#d").unwrap();
        set_inner_fragment(&mut doc, div, "<em>new</em>");
        assert_eq!(inner_text(&doc, div), "new");
        assert!(select_one(&doc, "#d > em").is_some());
        assert!(select_one(&doc, "#d > span").is_none());
    }

    #[test]
    fn test_rename_element_keeps_attrs_and_children() {
        let mut doc = parse_document(
            "<html><body><table><tr><td class=\"c\">Name</td></tr></table></body></html>",
        );
        let td = select_one(&doc, "td").unwrap();
        assert!(rename_element(&mut doc.tree, td, "th"));
        let th = select_one(&doc, "th").unwrap();
        assert_eq!(get_attr(&doc, th, "class").as_deref(), Some("c"));
        assert_eq!(inner_text(&doc, th), "Name");
    }

    #[test]
    fn test_stamp_stable_id_covers_nested_images() {
        let mut doc = parse_document(
            "<html><body><figure><img src=\"a.png\"><img src=\"b.png\"></figure></body></html>",
        );
        let figure = select_one(&doc, "figure").unwrap();
        stamp_stable_id(&mut doc, figure, "el-7");
        for img in select_all(&doc, "img") {
            assert_eq!(get_attr(&doc, img, ELEMENT_ID_ATTR).as_deref(), Some("el-7"));
        }
    }

    #[test]
    fn test_stable_id_reads_legacy_attribute() {
        let doc = parse_document(
            "<html><body><img element-data-id=\"el-9\" src=\"a.png\"></body></html>",
        );
        let img = select_one(&doc, "img").unwrap();
        assert_eq!(stable_id(&doc, img).as_deref(), Some("el-9"));
    }

    #[test]
    fn test_invalid_selector_is_no_match() {
        let doc = parse_document("<html><body></body></html>");
        assert!(select_one(&doc, "div#page[").is_none());
        assert!(select_all(&doc, ":::nope").is_empty());
    }
}
