// Namespace-agnostic XML tree for carrier responses.
// Prefixes are stripped while building; repeated children are always read
// through `elements`, which yields a sequence whatever the cardinality.
use crate::error::TrackingError;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    pub fn parse(xml: &str) -> Result<XmlNode, TrackingError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(open_node(&e)?),
                Ok(Event::Empty(e)) => {
                    let node = open_node(&e)?;
                    attach(&mut stack, &mut root, node);
                }
                Ok(Event::End(_)) => {
                    let mut node = stack
                        .pop()
                        .ok_or_else(|| TrackingError::parsing("Unexpected closing tag."))?;
                    node.text = finish_text(&node.text)?;
                    attach(&mut stack, &mut root, node);
                }
                // Raw text is kept escaped and resolved once the element closes.
                Ok(Event::Text(e)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(top) = stack.last_mut() {
                        let literal = String::from_utf8_lossy(&e);
                        top.text.push_str(&escape(literal.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push('&');
                        top.text.push_str(&String::from_utf8_lossy(&e));
                        top.text.push(';');
                    }
                }
                Ok(Event::DocType(_)) => {
                    return Err(TrackingError::parsing(
                        "DOCTYPE declarations (and entity definitions) are not allowed.",
                    ));
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TrackingError::parsing_with(
                        format!("Malformed XML at position {}", reader.error_position()),
                        e,
                    ));
                }
                _ => (),
            }
        }

        if !stack.is_empty() {
            return Err(TrackingError::parsing("Unexpected end of XML document."));
        }
        root.ok_or_else(|| TrackingError::parsing("XML document has no root element."))
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    // All child elements with the given local name: zero, one or many.
    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    // Follows a chain of child names, e.g. `["Body", "Fault"]`.
    pub fn path(&self, names: &[&str]) -> Option<&XmlNode> {
        names
            .iter()
            .try_fold(self, |node, name| node.child(name))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        Some(self.text.as_str()).filter(|t| !t.is_empty())
    }

    // Attribute or child-element text, whichever the document carries.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .or_else(|| self.child(name).and_then(XmlNode::text))
    }

    // `field` at the end of a child path, e.g. `["OperType", "Id"]`.
    pub fn field_at(&self, path: &[&str]) -> Option<&str> {
        let (last, parents) = path.split_last()?;
        self.path(parents)?.field(last)
    }

    // Attributes such as xsi:type do not count; only child elements do.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

fn open_node(start: &BytesStart) -> Result<XmlNode, TrackingError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr
            .map_err(|e| TrackingError::parsing_with(format!("Invalid attribute on <{name}>"), e))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map_err(|e| TrackingError::parsing_with(format!("Invalid value of {key}"), e))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlNode {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn finish_text(raw: &str) -> Result<String, TrackingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    unescape(trimmed)
        .map(|text| text.into_owned())
        .map_err(|e| TrackingError::parsing_with("Invalid character or entity reference", e))
}

// Only the first root element is kept; trailing siblings at document level are ignored.
fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_stripped_everywhere() {
        let xml = r#"<S:Envelope xmlns:S="urn:s" xmlns:ns2="urn:x">
            <S:Body><ns2:Item ns2:Barcode="123"/></S:Body>
        </S:Envelope>"#;
        let root = XmlNode::parse(xml).unwrap();

        assert_eq!(root.name, "Envelope");
        assert!(root.attributes.is_empty());
        let item = root.path(&["Body", "Item"]).unwrap();
        assert_eq!(item.attribute("Barcode"), Some("123"));
    }

    #[test]
    fn test_elements_normalizes_cardinality() {
        let root =
            XmlNode::parse("<value><Item>a</Item><Other/><Item>b</Item></value>").unwrap();
        let texts: Vec<_> = root.elements("Item").filter_map(XmlNode::text).collect();
        assert_eq!(texts, vec!["a", "b"]);

        let single = XmlNode::parse("<value><Item>a</Item></value>").unwrap();
        assert_eq!(single.elements("Item").count(), 1);
        assert_eq!(single.elements("Missing").count(), 0);
    }

    #[test]
    fn test_field_reads_attribute_or_child() {
        let as_attr = XmlNode::parse(r#"<Operation OperTypeID="2"/>"#).unwrap();
        let as_child = XmlNode::parse("<Operation><OperTypeID>2</OperTypeID></Operation>").unwrap();
        assert_eq!(as_attr.field("OperTypeID"), Some("2"));
        assert_eq!(as_child.field("OperTypeID"), Some("2"));
        assert_eq!(as_child.field("OperCtgID"), None);
    }

    #[test]
    fn test_entities_and_cdata_are_resolved() {
        let root = XmlNode::parse(
            r#"<r a="x &amp; y"><t>Tom &amp; Jerry &#1046;</t><c><![CDATA[<raw> & stuff]]></c></r>"#,
        )
        .unwrap();
        assert_eq!(root.attribute("a"), Some("x & y"));
        assert_eq!(root.child("t").unwrap().text(), Some("Tom & Jerry Ж"));
        assert_eq!(root.child("c").unwrap().text(), Some("<raw> & stuff"));
    }

    #[test]
    fn test_field_at_follows_path() {
        let root = XmlNode::parse(
            "<historyRecord><OperationParameters><OperType><Id>8</Id></OperType></OperationParameters></historyRecord>",
        )
        .unwrap();
        assert_eq!(root.field_at(&["OperationParameters", "OperType", "Id"]), Some("8"));
        assert_eq!(root.field_at(&["OperationParameters", "OperAttr", "Id"]), None);
    }

    #[test]
    fn test_leaf_ignores_attributes() {
        let typed = XmlNode::parse(r#"<value xsi:type="xs:string">T-1</value>"#).unwrap();
        let nested = XmlNode::parse("<value><id>1</id></value>").unwrap();
        assert!(typed.is_leaf());
        assert!(!nested.is_leaf());
    }

    #[test]
    fn test_rejects_doctype_entities() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<foo>&xxe;</foo>"#;
        let err = XmlNode::parse(xml).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("doctype"));
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(XmlNode::parse("<a><b></a>").is_err());
        assert!(XmlNode::parse("<a><b>").is_err());
        assert!(XmlNode::parse("").is_err());
        assert!(XmlNode::parse("not xml at all").is_err());
    }
}
