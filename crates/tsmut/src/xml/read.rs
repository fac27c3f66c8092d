//! Streaming reader for transition system documents.
//!
//! Elements and attributes are matched by local name, so documents that
//! prefix them with a namespace (`<ts:state>`) read the same as unqualified
//! ones. Structure is checked here; model invariants are left to
//! [`TransitionSystemBuilder::build`](crate::model::TransitionSystemBuilder::build).

use crate::config::{ParseOptions, UndeclaredTargets};
use crate::model::TransitionSystem;
use crate::result::{TsError, TsResult};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Parse a document with strict options.
///
/// # Errors
/// `MalformedDocument`, `DanglingTransition`, `UnknownStart` or
/// `DuplicateAction`; no partial model is returned.
pub fn parse(xml: &str) -> TsResult<TransitionSystem> {
    parse_with(xml, ParseOptions::default())
}

/// Parse a document with explicit options.
///
/// # Errors
/// See [`parse`].
pub fn parse_with(xml: &str, options: ParseOptions) -> TsResult<TransitionSystem> {
    let document = DocumentReader::new(xml).read()?;
    document.into_system(options)
}

/// Read and parse a document from disk.
///
/// # Errors
/// `Io` if the file cannot be read, otherwise see [`parse`].
pub fn from_file(path: impl AsRef<Path>, options: ParseOptions) -> TsResult<TransitionSystem> {
    let xml = std::fs::read_to_string(path)?;
    parse_with(&xml, options)
}

#[derive(Debug)]
struct RawState {
    id: String,
    transitions: Vec<(String, String)>,
}

#[derive(Debug)]
struct RawDocument {
    start: String,
    states: Vec<RawState>,
}

impl RawDocument {
    fn into_system(self, options: ParseOptions) -> TsResult<TransitionSystem> {
        let mut declared = HashSet::new();
        let mut builder = TransitionSystem::builder(self.start);

        for state in self.states {
            if !declared.insert(state.id.clone()) {
                return Err(TsError::malformed(format!(
                    "state '{}' is declared more than once",
                    state.id
                )));
            }
            builder = builder.state(state.id.clone());
            for (action, target) in state.transitions {
                builder = builder.transition(&state.id, action, target);
            }
        }

        if options.undeclared_targets == UndeclaredTargets::Materialize {
            let (materialized, added) = builder.declare_missing_targets();
            for id in &added {
                debug!(state = %id, "materialized undeclared target state");
            }
            builder = materialized;
        }

        let system = builder.build()?;
        debug!(
            start = system.start(),
            states = system.state_count(),
            transitions = system.transition_count(),
            "parsed transition system"
        );
        Ok(system)
    }
}

struct DocumentReader<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> DocumentReader<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        Self { reader }
    }

    /// Next structural event; prolog items and comments are skipped.
    fn next(&mut self) -> TsResult<Event<'a>> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Text(text)) if is_blank(&text) => {}
                Ok(event) => return Ok(event),
                Err(e) => {
                    return Err(TsError::malformed(format!(
                        "invalid XML at byte {}: {}",
                        self.reader.error_position(),
                        e
                    )))
                }
            }
        }
    }

    fn read(mut self) -> TsResult<RawDocument> {
        loop {
            match self.next()? {
                Event::Start(e) if local_name(&e) == "ts" => break,
                Event::Empty(e) if local_name(&e) == "ts" => {
                    return Err(TsError::malformed("missing <start> element"));
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(TsError::malformed(format!(
                        "expected <ts> root element, found <{}>",
                        local_name(&e)
                    )));
                }
                Event::Eof => return Err(TsError::malformed("document has no <ts> root element")),
                other => return Err(unexpected(&other, "before <ts>")),
            }
        }

        let mut start = None;
        let mut states = Vec::new();
        let mut states_seen = false;

        loop {
            match self.next()? {
                Event::Start(e) => match local_name(&e).as_str() {
                    "start" => {
                        if start.is_some() {
                            return Err(TsError::malformed("duplicate <start> element"));
                        }
                        start = Some(self.read_start()?);
                    }
                    "states" => {
                        if states_seen {
                            return Err(TsError::malformed("duplicate <states> element"));
                        }
                        states_seen = true;
                        self.read_states(&mut states)?;
                    }
                    other => return Err(unexpected_element(other, "<ts>")),
                },
                Event::Empty(e) => match local_name(&e).as_str() {
                    "start" => return Err(TsError::malformed("<start> element is empty")),
                    "states" => {
                        if states_seen {
                            return Err(TsError::malformed("duplicate <states> element"));
                        }
                        states_seen = true;
                    }
                    other => return Err(unexpected_element(other, "<ts>")),
                },
                Event::End(_) => break,
                Event::Eof => return Err(TsError::malformed("unexpected end of document inside <ts>")),
                other => return Err(unexpected(&other, "inside <ts>")),
            }
        }

        match self.next()? {
            Event::Eof => {}
            other => return Err(unexpected(&other, "after </ts>")),
        }

        let start = start.ok_or_else(|| TsError::malformed("missing <start> element"))?;
        Ok(RawDocument { start, states })
    }

    fn read_start(&mut self) -> TsResult<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&unescape(&t)?),
                Event::CData(c) => {
                    let raw = std::str::from_utf8(&c)
                        .map_err(|e| TsError::malformed(format!("invalid UTF-8 in <start>: {e}")))?;
                    text.push_str(raw);
                }
                Event::End(_) => break,
                Event::Eof => return Err(TsError::malformed("unexpected end of document in <start>")),
                other => return Err(unexpected(&other, "inside <start>")),
            }
        }

        let id = text.trim();
        if id.is_empty() {
            return Err(TsError::malformed("<start> element is empty"));
        }
        Ok(id.to_string())
    }

    fn read_states(&mut self, states: &mut Vec<RawState>) -> TsResult<()> {
        loop {
            match self.next()? {
                Event::Start(e) if local_name(&e) == "state" => {
                    let id = required_attribute(&e, "state", "id")?;
                    let transitions = self.read_transitions(&id)?;
                    states.push(RawState { id, transitions });
                }
                Event::Empty(e) if local_name(&e) == "state" => {
                    let id = required_attribute(&e, "state", "id")?;
                    states.push(RawState {
                        id,
                        transitions: Vec::new(),
                    });
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(unexpected_element(&local_name(&e), "<states>"));
                }
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(TsError::malformed("unexpected end of document in <states>")),
                other => return Err(unexpected(&other, "inside <states>")),
            }
        }
    }

    fn read_transitions(&mut self, state_id: &str) -> TsResult<Vec<(String, String)>> {
        let mut transitions = Vec::new();
        loop {
            match self.next()? {
                Event::Empty(e) if local_name(&e) == "transition" => {
                    transitions.push(transition_attributes(&e)?);
                }
                Event::Start(e) if local_name(&e) == "transition" => {
                    transitions.push(transition_attributes(&e)?);
                    self.expect_end("transition")?;
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(unexpected_element(
                        &local_name(&e),
                        &format!("state '{}'", state_id),
                    ));
                }
                Event::End(_) => return Ok(transitions),
                Event::Eof => {
                    return Err(TsError::malformed(format!(
                        "unexpected end of document in state '{}'",
                        state_id
                    )))
                }
                other => return Err(unexpected(&other, &format!("inside state '{}'", state_id))),
            }
        }
    }

    fn expect_end(&mut self, element: &str) -> TsResult<()> {
        match self.next()? {
            Event::End(_) => Ok(()),
            other => Err(unexpected(&other, &format!("inside <{}>", element))),
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

fn unescape(text: &BytesText<'_>) -> TsResult<String> {
    text.unescape()
        .map(|s| s.into_owned())
        .map_err(|e| TsError::malformed(format!("invalid text: {e}")))
}

fn attribute(e: &BytesStart<'_>, name: &str) -> TsResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TsError::malformed(format!("invalid attribute: {err}")))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| TsError::malformed(format!("invalid '{name}' value: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(e: &BytesStart<'_>, element: &str, name: &str) -> TsResult<String> {
    let value = attribute(e, name)?.ok_or_else(|| {
        TsError::malformed(format!("<{element}> is missing the '{name}' attribute"))
    })?;
    if value.trim().is_empty() {
        return Err(TsError::malformed(format!(
            "<{element}> has an empty '{name}' attribute"
        )));
    }
    Ok(value)
}

fn transition_attributes(e: &BytesStart<'_>) -> TsResult<(String, String)> {
    let action = required_attribute(e, "transition", "action")?;
    let target = required_attribute(e, "transition", "target")?;
    Ok((action, target))
}

fn unexpected_element(name: &str, context: &str) -> TsError {
    TsError::malformed(format!("unexpected element <{name}> in {context}"))
}

fn unexpected(event: &Event<'_>, context: &str) -> TsError {
    let what = match event {
        Event::Text(_) => "text".to_string(),
        Event::CData(_) => "CDATA section".to_string(),
        Event::Start(e) | Event::Empty(e) => format!("element <{}>", local_name(e)),
        Event::End(_) => "closing tag".to_string(),
        Event::Eof => "end of document".to_string(),
        _ => "content".to_string(),
    };
    TsError::malformed(format!("unexpected {what} {context}"))
}
