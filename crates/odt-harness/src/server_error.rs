//! Service error payloads
//!
//! Parses the XML error body a data service returns:
//!
//! ```xml
//! <m:error xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
//!   <m:code>400</m:code>
//!   <m:message xml:lang="en-US">Outer message</m:message>
//!   <m:innererror>
//!     <m:message>Inner message</m:message>
//!     <m:internalexception>
//!       <m:message>Innermost message</m:message>
//!     </m:internalexception>
//!   </m:innererror>
//! </m:error>
//! ```
//!
//! Namespace prefixes are ignored; elements are matched on local names.

use quick_xml::events::Event;
use quick_xml::Reader;

/// One level of a service error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerErrorPayload {
    /// `code` element
    pub code: Option<String>,
    /// `message` element
    pub message: Option<String>,
    /// Nested `innererror` / `internalexception`
    pub inner: Option<Box<ServerErrorPayload>>,
}

impl ServerErrorPayload {
    /// Parse an XML error body
    ///
    /// # Errors
    /// A description of the problem when the body is not well-formed or its
    /// root element is not `error`.
    pub fn from_xml(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut levels: Vec<ServerErrorPayload> = Vec::new();
        let mut path: Vec<String> = Vec::new();
        // (level index, path depth it opened at) for every level still open
        let mut open: Vec<(usize, usize)> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    if path.is_empty() && name != "error" {
                        return Err(format!("expected root element 'error', found '{name}'"));
                    }
                    if path.is_empty() || is_nesting(&name) {
                        open.push((levels.len(), path.len()));
                        levels.push(ServerErrorPayload::default());
                    }
                    path.push(name);
                }
                Ok(Event::End(_)) => {
                    path.pop();
                    if open.last().is_some_and(|&(_, depth)| depth == path.len()) {
                        open.pop();
                    }
                }
                Ok(Event::Text(text)) => {
                    let value = text.unescape().map_err(|e| e.to_string())?.into_owned();
                    let current = open.last().and_then(|&(index, _)| levels.get_mut(index));
                    let (Some(element), Some(level)) = (path.last(), current) else {
                        continue;
                    };
                    match element.as_str() {
                        "message" => level.message = Some(value),
                        "code" => level.code = Some(value),
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(format!("at position {}: {e}", reader.buffer_position())),
            }
        }

        // fold innermost-first so each level owns the one below it
        levels
            .into_iter()
            .rev()
            .reduce(|inner, mut outer| {
                outer.inner = Some(Box::new(inner));
                outer
            })
            .ok_or_else(|| "empty error payload".to_string())
    }

    /// This level followed by nested levels, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &ServerErrorPayload> {
        std::iter::successors(Some(self), |p| p.inner.as_deref())
    }
}

fn is_nesting(local_name: &str) -> bool {
    matches!(local_name, "innererror" | "internalexception")
}
