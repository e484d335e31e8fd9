// ABOUTME: Parses XML bytes into a Document and serializes a Document back to XML

use crate::error::{ContextError, XacroError};
use crate::xmltree::{Document, Element, Node, NodeId, QName};
use quick_xml::events::{BytesCData, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

/// Parses `source` into an owned `Document`, preserving comments and
/// splitting `xmlns`/`xmlns:*` declarations onto each element's
/// `namespaces` list (§4.6). This is the "conforming XML 1.0 parser with
/// namespace and comment preservation" §1 delegates to an external
/// collaborator.
pub fn parse(source: &str) -> Result<Document, ContextError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
        match event {
            Event::Start(e) => {
                let id = push_element(&mut doc, &e)?;
                attach(&mut doc, &mut stack, id);
                stack.push(id);
            }
            Event::Empty(e) => {
                let id = push_element(&mut doc, &e)?;
                attach(&mut doc, &mut stack, id);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let text = decode_text(&t)?;
                let id = doc.push(Node::Text(text));
                attach(&mut doc, &mut stack, id);
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                let id = doc.push(Node::CData(text));
                attach(&mut doc, &mut stack, id);
            }
            Event::Comment(t) => {
                let text = decode_text(&BytesText::from_escaped(
                    String::from_utf8_lossy(t.as_ref()).into_owned(),
                ))?;
                let id = doc.push(Node::Comment(text));
                attach(&mut doc, &mut stack, id);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

fn decode_text(t: &BytesText) -> Result<String, ContextError> {
    t.unescape()
        .map(|c| c.into_owned())
        .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))
}

fn push_element(
    doc: &mut Document,
    e: &quick_xml::events::BytesStart,
) -> Result<NodeId, ContextError> {
    let tag = QName::parse(&String::from_utf8_lossy(e.name().as_ref()));
    let mut attrs = Vec::new();
    let mut namespaces = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?
            .into_owned();

        if key == "xmlns" {
            namespaces.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.push((Some(prefix.to_string()), value));
        } else {
            attrs.push((QName::parse(&key), value));
        }
    }

    Ok(doc.push(Node::Element(Element {
        tag,
        attrs,
        namespaces,
        children: Vec::new(),
    })))
}

fn attach(doc: &mut Document, stack: &mut [NodeId], id: NodeId) {
    if let Some(&parent) = stack.last() {
        if let Node::Element(e) = doc.get_mut(parent) {
            e.children.push(id);
        }
    } else if doc.root.is_none() {
        if matches!(doc.get(id), Node::Element(_)) {
            doc.root = Some(id);
        }
    }
}

/// Serializes `doc` to a UTF-8 XML string, depth-first, re-emitting each
/// element's namespace declarations and attributes in order. Document order
/// is preserved bit-for-bit per the Idempotence/Deterministic-order
/// properties in §8.
pub fn serialize(doc: &Document) -> Result<String, ContextError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    if let Some(root) = doc.root {
        write_node(doc, &mut writer, root)?;
    }
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))
}

fn write_node(
    doc: &Document,
    writer: &mut Writer<Cursor<Vec<u8>>>,
    id: NodeId,
) -> Result<(), ContextError> {
    match doc.get(id) {
        Node::Text(t) => {
            writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
        }
        Node::Comment(t) => {
            writer
                .write_event(Event::Comment(BytesText::new(t)))
                .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
        }
        Node::CData(t) => {
            writer
                .write_event(Event::CData(BytesCData::new(t)))
                .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
        }
        Node::Element(el) => {
            let mut start = quick_xml::events::BytesStart::new(el.tag.to_string());
            for (prefix, uri) in &el.namespaces {
                match prefix {
                    Some(p) => start.push_attribute((format!("xmlns:{p}").as_str(), uri.as_str())),
                    None => start.push_attribute(("xmlns", uri.as_str())),
                }
            }
            for (name, value) in &el.attrs {
                start.push_attribute((name.to_string().as_str(), value.as_str()));
            }

            if el.children.is_empty() {
                writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
            } else {
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
                for &child in &el.children {
                    write_node(doc, writer, child)?;
                }
                writer
                    .write_event(Event::End(quick_xml::events::BytesEnd::new(
                        el.tag.to_string(),
                    )))
                    .map_err(|e| ContextError::new(XacroError::ParseFailure(e.to_string())))?;
            }
        }
    }
    Ok(())
}
