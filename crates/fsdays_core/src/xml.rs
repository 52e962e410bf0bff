//! Owned XML tree for save documents.
//!
//! The tree keeps everything the game wrote (attributes in source order,
//! comments, CDATA, processing instructions) so a document can be edited and
//! written back without losing structure the editor does not understand.
//! Whitespace-only text between elements is not significant: the serializer
//! re-indents with the unit detected at parse time.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};

use crate::core_api::{CoreError, CoreErrorCode};

const DEFAULT_INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
    indent: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.set_text(text);
        element
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// True when the element has no child elements (it may still hold text).
    pub fn is_leaf(&self) -> bool {
        self.elements().next().is_none()
    }

    /// Concatenated direct text and CDATA content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    /// Replaces the direct text content, leaving child elements in place.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        self.children.insert(0, Node::Text(text.into()));
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> {
        self.elements_mut().filter(move |e| e.name == name)
    }

    pub fn push_child(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        let index = self.children.len() - 1;
        self.element_at(index)
    }

    /// Returns the first direct child named `name`, appending an empty one if
    /// there is none.
    pub fn ensure_child(&mut self, name: &str) -> &mut Element {
        let existing = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.name == name));
        match existing {
            Some(index) => self.element_at(index),
            None => self.push_child(Element::new(name)),
        }
    }

    fn element_at(&mut self, index: usize) -> &mut Element {
        let Node::Element(element) = &mut self.children[index] else {
            unreachable!("child {index} is not an element");
        };
        element
    }

    /// Depth-first, pre-order search over descendants (not `self`).
    pub fn find<P>(&self, mut pred: P) -> Option<&Element>
    where
        P: FnMut(&Element) -> bool,
    {
        self.find_by(&mut pred)
    }

    fn find_by<P>(&self, pred: &mut P) -> Option<&Element>
    where
        P: FnMut(&Element) -> bool,
    {
        for child in self.elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_by(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut<P>(&mut self, mut pred: P) -> Option<&mut Element>
    where
        P: FnMut(&Element) -> bool,
    {
        self.find_mut_by(&mut pred)
    }

    fn find_mut_by<P>(&mut self, pred: &mut P) -> Option<&mut Element>
    where
        P: FnMut(&Element) -> bool,
    {
        for child in self.elements_mut() {
            if pred(&*child) {
                return Some(child);
            }
            if let Some(found) = child.find_mut_by(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_named(&self, name: &str) -> Option<&Element> {
        self.find(|e| e.name == name)
    }

    pub fn find_named_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.find_mut(|e| e.name == name)
    }

    /// Calls `f` on every descendant, parents before their children.
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        for child in self.elements_mut() {
            f(&mut *child);
            child.visit_mut(f);
        }
    }

    /// Removes every descendant for which `pred(parent_name, child)` holds and
    /// returns how many sub-trees were dropped. Removed sub-trees are not
    /// searched further.
    pub fn remove_descendants_where<P>(&mut self, pred: &mut P) -> usize
    where
        P: FnMut(&str, &Element) -> bool,
    {
        let Element { name, children, .. } = self;
        let before = children.len();
        children.retain(|node| match node {
            Node::Element(e) => !pred(name.as_str(), e),
            _ => true,
        });
        let mut removed = before - children.len();
        // Leftover indentation would otherwise be written as text content.
        if removed > 0
            && children
                .iter()
                .all(|node| matches!(node, Node::Text(t) if t.trim().is_empty()))
        {
            children.clear();
        }

        for node in children.iter_mut() {
            if let Node::Element(e) = node {
                removed += e.remove_descendants_where(pred);
            }
        }
        removed
    }

    fn has_significant_text(&self) -> bool {
        self.children.iter().any(|node| match node {
            Node::Text(t) => !t.trim().is_empty(),
            Node::CData(_) => true,
            _ => false,
        })
    }

    fn has_structure(&self) -> bool {
        self.children.iter().any(|node| {
            matches!(
                node,
                Node::Element(_) | Node::Comment(_) | Node::ProcessingInstruction(_)
            )
        })
    }
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self {
            prolog: vec![Node::Declaration(
                r#"xml version="1.0" encoding="utf-8" standalone="no""#.to_string(),
            )],
            root,
            epilog: Vec::new(),
            indent: DEFAULT_INDENT.to_string(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut reader = Reader::from_str(input);

        let mut stack: Vec<Element> = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                CoreError::new(
                    CoreErrorCode::Parse,
                    format!("malformed XML at byte {}: {e}", reader.buffer_position()),
                )
            })?;

            let node = match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => Node::Element(element),
                    None => {
                        return Err(CoreError::new(
                            CoreErrorCode::Parse,
                            "unexpected closing tag outside the root element",
                        ));
                    }
                },
                Event::Empty(start) => Node::Element(element_from_start(&start)?),
                Event::Text(text) => {
                    let value = text.unescape().map_err(|e| {
                        CoreError::new(CoreErrorCode::Parse, format!("invalid text content: {e}"))
                    })?;
                    Node::Text(value.into_owned())
                }
                Event::CData(data) => Node::CData(String::from_utf8_lossy(&data).into_owned()),
                Event::Comment(text) => Node::Comment(String::from_utf8_lossy(&text).into_owned()),
                Event::Decl(decl) => {
                    Node::Declaration(String::from_utf8_lossy(&decl).into_owned())
                }
                Event::PI(pi) => {
                    Node::ProcessingInstruction(String::from_utf8_lossy(&pi).into_owned())
                }
                Event::DocType(text) => {
                    Node::DocType(String::from_utf8_lossy(&text).trim().to_string())
                }
                Event::Eof => break,
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }

            match node {
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(text) => {
                    return Err(CoreError::new(
                        CoreErrorCode::Parse,
                        format!("text outside the root element: {:?}", text.trim()),
                    ));
                }
                Node::Element(element) => {
                    if root.is_some() {
                        return Err(CoreError::new(
                            CoreErrorCode::Parse,
                            format!("second root element <{}>", element.name),
                        ));
                    }
                    root = Some(element);
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if let Some(open) = stack.last() {
            return Err(CoreError::new(
                CoreErrorCode::Parse,
                format!("unclosed element <{}>", open.name),
            ));
        }
        let Some(root) = root else {
            return Err(CoreError::new(
                CoreErrorCode::Parse,
                "document has no root element",
            ));
        };

        let indent = detect_indent(&root);
        Ok(Self {
            prolog,
            root,
            epilog,
            indent,
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            write_node_inline(&mut out, node);
            out.push('\n');
        }
        write_element(&mut out, &self.root, 0, &self.indent);
        out.push('\n');
        for node in &self.epilog {
            write_node_inline(&mut out, node);
            out.push('\n');
        }
        out
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, CoreError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("invalid attribute in <{name}>: {e}"),
            )
        })?;
        let value = attr.unescape_value().map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("invalid attribute value in <{name}>: {e}"),
            )
        })?;
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn detect_indent(root: &Element) -> String {
    for node in &root.children {
        let Node::Text(text) = node else {
            continue;
        };
        if !text.trim().is_empty() {
            continue;
        }
        if let Some((_, tail)) = text.rsplit_once('\n') {
            if !tail.is_empty() && tail.chars().all(|c| c == ' ' || c == '\t') {
                return tail.to_string();
            }
        }
    }
    DEFAULT_INDENT.to_string()
}

fn push_indent(out: &mut String, depth: usize, indent: &str) {
    for _ in 0..depth {
        out.push_str(indent);
    }
}

fn write_start_tag(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize, indent: &str) {
    if element.children.is_empty() {
        write_start_tag(out, element);
        out.push_str("/>");
        return;
    }

    // Mixed content is significant; keep it exactly as parsed.
    if !element.has_structure() || element.has_significant_text() {
        write_element_inline(out, element);
        return;
    }

    write_start_tag(out, element);
    out.push('>');
    for node in &element.children {
        if matches!(node, Node::Text(_)) {
            continue;
        }
        out.push('\n');
        push_indent(out, depth + 1, indent);
        match node {
            Node::Element(child) => write_element(out, child, depth + 1, indent),
            other => write_node_inline(out, other),
        }
    }
    out.push('\n');
    push_indent(out, depth, indent);
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_element_inline(out: &mut String, element: &Element) {
    write_start_tag(out, element);
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for node in &element.children {
        write_node_inline(out, node);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_node_inline(out: &mut String, node: &Node) {
    match node {
        Node::Element(e) => write_element_inline(out, e),
        Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
        Node::CData(t) => {
            out.push_str("<![CDATA[");
            out.push_str(t);
            out.push_str("]]>");
        }
        Node::Comment(t) => {
            out.push_str("<!--");
            out.push_str(t);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(t) | Node::Declaration(t) => {
            out.push_str("<?");
            out.push_str(t);
            out.push_str("?>");
        }
        Node::DocType(t) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(t);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Element, Node, XmlDocument};
    use crate::core_api::CoreErrorCode;

    const CANONICAL: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<environment>
    <daysPerPeriod>3</daysPerPeriod>
    <!-- cached -->
    <weather>
        <object id="1" kind="rain"/>
    </weather>
</environment>
"#;

    #[test]
    fn canonical_document_serializes_byte_for_byte() {
        let doc = XmlDocument::parse(CANONICAL).expect("fixture should parse");
        assert_eq!(doc.indent(), "    ");
        assert_eq!(doc.to_xml_string(), CANONICAL);
    }

    #[test]
    fn parse_keeps_attributes_in_source_order() {
        let doc = XmlDocument::parse(CANONICAL).expect("fixture should parse");
        let object = doc.root().find_named("object").expect("object element");
        let names: Vec<&str> = object.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "kind"]);
        assert_eq!(object.attribute("kind"), Some("rain"));
    }

    #[test]
    fn tab_indentation_is_detected_and_reused() {
        let input = "<farms>\n\t<farm>\n\t\t<money>1</money>\n\t</farm>\n</farms>\n";
        let doc = XmlDocument::parse(input).expect("tabbed input should parse");
        assert_eq!(doc.indent(), "\t");
        assert_eq!(doc.to_xml_string(), input);
    }

    #[test]
    fn collapsed_input_falls_back_to_two_spaces() {
        let doc = XmlDocument::parse("<a><b>1</b><c/></a>").expect("input should parse");
        assert_eq!(doc.to_xml_string(), "<a>\n  <b>1</b>\n  <c/>\n</a>\n");
    }

    #[test]
    fn escaped_text_round_trips() {
        let doc = XmlDocument::parse("<a><b>x &amp; y &lt; z</b></a>").expect("input should parse");
        let b = doc.root().child("b").expect("b element");
        assert_eq!(b.text(), "x & y < z");
        assert!(doc.to_xml_string().contains("<b>x &amp; y &lt; z</b>"));
    }

    #[test]
    fn mixed_content_is_written_verbatim() {
        let input = "<a>\n  <p>hello <b>world</b> again</p>\n</a>\n";
        let doc = XmlDocument::parse(input).expect("input should parse");
        assert_eq!(doc.to_xml_string(), input);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = XmlDocument::parse("<a><b></a>").expect_err("mismatched tags must fail");
        assert_eq!(err.code, CoreErrorCode::Parse);

        let err = XmlDocument::parse("<a>").expect_err("unclosed root must fail");
        assert_eq!(err.code, CoreErrorCode::Parse);

        let err = XmlDocument::parse("   ").expect_err("empty input must fail");
        assert_eq!(err.code, CoreErrorCode::Parse);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let doc = XmlDocument::parse("\u{feff}<a/>").expect("BOM input should parse");
        assert_eq!(doc.root().name(), "a");
    }

    #[test]
    fn find_is_depth_first_preorder() {
        let doc = XmlDocument::parse("<r><x><hit n=\"1\"/></x><hit n=\"2\"/></r>")
            .expect("input should parse");
        let hit = doc.root().find_named("hit").expect("hit element");
        assert_eq!(hit.attribute("n"), Some("1"));
    }

    #[test]
    fn remove_descendants_where_sees_parent_names() {
        let mut doc =
            XmlDocument::parse("<r><keep><drop/></keep><other><drop/><stay/></other></r>")
                .expect("input should parse");
        let removed = doc
            .root_mut()
            .remove_descendants_where(&mut |parent, child| {
                parent == "other" && child.name() == "drop"
            });
        assert_eq!(removed, 1);
        assert!(doc.root().child("keep").and_then(|k| k.child("drop")).is_some());
        assert!(doc.root().child("other").and_then(|o| o.child("drop")).is_none());
    }

    #[test]
    fn emptied_container_is_self_closed() {
        let mut doc = XmlDocument::parse("<r>\n    <c>\n        <x/>\n    </c>\n</r>\n")
            .expect("input should parse");
        doc.root_mut()
            .remove_descendants_where(&mut |_, child| child.name() == "x");
        assert_eq!(doc.to_xml_string(), "<r>\n    <c/>\n</r>\n");
    }

    #[test]
    fn ensure_child_reuses_existing_element() {
        let mut root = Element::new("settings");
        root.ensure_child("a").set_text("1");
        root.ensure_child("a").set_text("2");
        assert_eq!(root.elements().count(), 1);
        assert_eq!(root.child("a").map(Element::text).as_deref(), Some("2"));
    }

    #[test]
    fn set_text_replaces_previous_text_nodes() {
        let mut e = Element::with_text("money", "12");
        e.set_text("0");
        assert_eq!(e.children(), &[Node::Text("0".to_string())]);
    }
}
