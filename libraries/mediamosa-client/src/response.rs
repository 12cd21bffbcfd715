//! MediaMosa XML response envelope.
//!
//! Every API call answers with
//!
//! ```xml
//! <response>
//!   <header>
//!     <request_result_id>601</request_result_id>
//!     <request_result_description></request_result_description>
//!     ...
//!   </header>
//!   <items>
//!     <item id="1">...</item>
//!   </items>
//! </response>
//! ```
//!
//! Items carry arbitrary, possibly nested fields, so they are kept as a small
//! element tree rather than typed structs.

use crate::error::{MediaMosaError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// `request_result_id` of a successful call.
pub const MM_OK: &str = "601";
/// `request_result_id` returned when the session cookie is missing or expired.
pub const MM_AUTH_REQUIRED: &str = "1601";

/// Status of a response, as far as the client cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    AuthRequired,
    Other(String),
}

impl ResultCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            MM_OK => ResultCode::Ok,
            MM_AUTH_REQUIRED => ResultCode::AuthRequired,
            other => ResultCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResultCode::Ok => MM_OK,
            ResultCode::AuthRequired => MM_AUTH_REQUIRED,
            ResultCode::Other(code) => code.as_str(),
        }
    }
}

/// One XML element of an item: its text and child elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Item>,
}

impl Item {
    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Item> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child element with the given name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Text at the end of a chain of first-matching children,
    /// e.g. `["mediafiles", "mediafile", "transcode_profile_id"]`.
    pub fn path(&self, path: &[&str]) -> Option<&str> {
        let mut current = self;
        for name in path {
            current = current.child(name)?;
        }
        Some(current.text.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parsed response of one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestResult {
    pub code: ResultCode,
    pub description: String,
    /// All header fields, including `request_result_id` and description
    pub header: HashMap<String, String>,
    pub items: Vec<Item>,
}

impl RequestResult {
    /// Parse an XML response body.
    pub fn parse(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Err(MediaMosaError::EmptyResponse);
        }

        let root = parse_tree(body)?;
        if root.name != "response" {
            return Err(MediaMosaError::Parse(format!(
                "unexpected root element <{}>",
                root.name
            )));
        }

        let header_element = root
            .child("header")
            .ok_or_else(|| MediaMosaError::Parse("missing <header>".into()))?;
        let header: HashMap<String, String> = header_element
            .children
            .iter()
            .map(|c| (c.name.clone(), c.text.clone()))
            .collect();

        let code = header
            .get("request_result_id")
            .ok_or_else(|| MediaMosaError::Parse("missing request_result_id".into()))?;
        let description = header
            .get("request_result_description")
            .cloned()
            .unwrap_or_default();

        let items = root
            .child("items")
            .map(|items| items.children("item").cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            code: ResultCode::from_code(code.trim()),
            description,
            header,
            items,
        })
    }

    /// The raw `request_result_id`.
    pub fn code_str(&self) -> &str {
        self.code.as_str()
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResultCode::Ok
    }

    pub fn first_item(&self) -> Option<&Item> {
        self.items.first()
    }

    /// Convert a non-OK result into an [`MediaMosaError::Api`].
    pub fn into_api_result(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(MediaMosaError::Api {
                code: self.code.as_str().to_string(),
                description: self.description,
            })
        }
    }

    /// Text of `field` in the first item.
    pub fn first_field(&self, field: &str) -> Result<&str> {
        self.first_path(&[field])
    }

    /// Text at `path` below the first item.
    pub fn first_path(&self, path: &[&str]) -> Result<&str> {
        self.first_item()
            .ok_or_else(|| MediaMosaError::FieldExtraction("response has no items".into()))?
            .path(path)
            .ok_or_else(|| MediaMosaError::FieldExtraction(path.join("/")))
    }
}

fn parse_tree(body: &str) -> Result<Item> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Item> = Vec::new();
    let mut root: Option<Item> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(element(&start)?);
            }
            Event::Empty(start) => {
                let item = element(&start)?;
                attach(&mut stack, &mut root, item)?;
            }
            Event::End(_) => {
                let item = stack
                    .pop()
                    .ok_or_else(|| MediaMosaError::Parse("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, item)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(MediaMosaError::Parse("unexpected end of document".into()));
    }
    root.ok_or_else(|| MediaMosaError::Parse("document has no root element".into()))
}

fn element(start: &quick_xml::events::BytesStart<'_>) -> Result<Item> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| MediaMosaError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Item {
        name,
        attributes,
        ..Item::default()
    })
}

fn attach(stack: &mut [Item], root: &mut Option<Item>, item: Item) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(item),
        None if root.is_none() => *root = Some(item),
        None => return Err(MediaMosaError::Parse("multiple root elements".into())),
    }
    Ok(())
}
