//! Reading and writing XML-RPC documents.

use quick_xml::{Reader, escape::escape, events::Event};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::vec::IntoIter;

use crate::xmlrpc::{RpcError, Value};

/// Fault codes for requests that never reach a method.
pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

const XML_DECLARATION: &str = r#"<?xml version="1.0"?>"#;

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            params,
        }
    }

    pub fn parse(xml: &str) -> Result<Self, RpcError> {
        let mut parser = Parser::new(xml)?;
        parser.open("methodCall")?;
        parser.open("methodName")?;
        let method_name = parser.text().trim().to_string();
        parser.close("methodName")?;

        let mut params = Vec::new();
        if parser.at_open("params") {
            parser.open("params")?;
            while parser.at_open("param") {
                parser.open("param")?;
                params.push(parser.value()?);
                parser.close("param")?;
            }
            parser.close("params")?;
        }
        parser.close("methodCall")?;
        parser.finish()?;

        if method_name.is_empty() {
            return Err(RpcError::Parse("empty methodName".to_string()));
        }
        Ok(Self {
            method_name,
            params,
        })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        out.push_str("<methodCall><methodName>");
        out.push_str(&escape(self.method_name.as_str()));
        out.push_str("</methodName><params>");
        for param in &self.params {
            out.push_str("<param>");
            param.write_xml(&mut out);
            out.push_str("</param>");
        }
        out.push_str("</params></methodCall>");
        out
    }
}

/// Result value of a `methodResponse`, or its fault as `RpcError::Fault`.
pub fn parse_method_response(xml: &str) -> Result<Value, RpcError> {
    let mut parser = Parser::new(xml)?;
    parser.open("methodResponse")?;

    if parser.at_open("fault") {
        parser.open("fault")?;
        let fault = parser.value()?;
        parser.close("fault")?;
        parser.close("methodResponse")?;
        parser.finish()?;

        let code = fault.member("faultCode").and_then(Value::as_i32);
        let message = fault.member("faultString").and_then(Value::as_str);
        return match (code, message) {
            (Some(code), Some(message)) => Err(RpcError::Fault {
                code,
                message: message.to_string(),
            }),
            _ => Err(RpcError::Parse("malformed fault".to_string())),
        };
    }

    parser.open("params")?;
    parser.open("param")?;
    let value = parser.value()?;
    parser.close("param")?;
    parser.close("params")?;
    parser.close("methodResponse")?;
    parser.finish()?;
    Ok(value)
}

pub fn response_xml(value: &Value) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push_str("<methodResponse><params><param>");
    value.write_xml(&mut out);
    out.push_str("</param></params></methodResponse>");
    out
}

pub fn fault_xml(code: i32, message: &str) -> String {
    let mut members = BTreeMap::new();
    members.insert("faultCode".to_string(), Value::Int(code));
    members.insert("faultString".to_string(), Value::from(message));

    let mut out = String::from(XML_DECLARATION);
    out.push_str("<methodResponse><fault>");
    Value::Struct(members).write_xml(&mut out);
    out.push_str("</fault></methodResponse>");
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>, RpcError> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|e| RpcError::Parse(e.to_string()))?;
        match event {
            Event::Start(tag) => tokens.push(Token::Open(tag_name(tag.local_name().as_ref()))),
            Event::End(tag) => tokens.push(Token::Close(tag_name(tag.local_name().as_ref()))),
            Event::Empty(tag) => {
                let name = tag_name(tag.local_name().as_ref());
                tokens.push(Token::Open(name.clone()));
                tokens.push(Token::Close(name));
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| RpcError::Parse(e.to_string()))?;
                push_text(&mut tokens, &text);
            }
            Event::CData(data) => push_text(&mut tokens, &String::from_utf8_lossy(&data)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(tokens)
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Adjacent text and CDATA sections form one text token.
fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Deepest `<value>` nesting accepted before the document is rejected.
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    depth: usize,
}

impl Parser {
    fn new(xml: &str) -> Result<Self, RpcError> {
        Ok(Self {
            tokens: tokenize(xml)?.into_iter().peekable(),
            depth: 0,
        })
    }

    /// Whitespace between structural elements carries no data.
    fn skip_space(&mut self) {
        while self
            .tokens
            .next_if(|token| matches!(token, Token::Text(text) if text.trim().is_empty()))
            .is_some()
        {}
    }

    fn at_open(&mut self, name: &str) -> bool {
        self.skip_space();
        matches!(self.tokens.peek(), Some(Token::Open(open)) if open == name)
    }

    fn open(&mut self, name: &str) -> Result<(), RpcError> {
        self.skip_space();
        match self.tokens.next() {
            Some(Token::Open(open)) if open == name => Ok(()),
            other => Err(unexpected(name, other)),
        }
    }

    fn close(&mut self, name: &str) -> Result<(), RpcError> {
        self.skip_space();
        match self.tokens.next() {
            Some(Token::Close(close)) if close == name => Ok(()),
            other => Err(unexpected(&format!("/{name}"), other)),
        }
    }

    /// Character data up to the next tag; empty when there is none.
    fn text(&mut self) -> String {
        match self.tokens.next_if(|token| matches!(token, Token::Text(_))) {
            Some(Token::Text(text)) => text,
            _ => String::new(),
        }
    }

    fn finish(&mut self) -> Result<(), RpcError> {
        self.skip_space();
        match self.tokens.next() {
            None => Ok(()),
            other => Err(unexpected("end of document", other)),
        }
    }

    fn value(&mut self) -> Result<Value, RpcError> {
        if self.depth >= MAX_DEPTH {
            return Err(RpcError::Parse("value nested too deeply".to_string()));
        }
        self.depth += 1;
        let value = self.nested_value();
        self.depth -= 1;
        value
    }

    fn nested_value(&mut self) -> Result<Value, RpcError> {
        self.open("value")?;
        let untyped = self.text();
        if matches!(self.tokens.peek(), Some(Token::Close(close)) if close == "value") {
            self.tokens.next();
            return Ok(Value::String(untyped));
        }
        if !untyped.trim().is_empty() {
            return Err(RpcError::Parse("text mixed with a typed value".to_string()));
        }

        let kind = match self.tokens.next() {
            Some(Token::Open(kind)) => kind,
            other => return Err(unexpected("value type", other)),
        };
        let value = self.typed(&kind)?;
        self.close("value")?;
        Ok(value)
    }

    fn typed(&mut self, kind: &str) -> Result<Value, RpcError> {
        let value = match kind {
            "array" => {
                self.open("data")?;
                let mut values = Vec::new();
                while self.at_open("value") {
                    values.push(self.value()?);
                }
                self.close("data")?;
                Value::Array(values)
            }
            "struct" => {
                let mut members = BTreeMap::new();
                while self.at_open("member") {
                    self.open("member")?;
                    self.open("name")?;
                    let name = self.text();
                    self.close("name")?;
                    let value = self.value()?;
                    self.close("member")?;
                    members.insert(name, value);
                }
                Value::Struct(members)
            }
            "nil" => Value::Nil,
            "string" => Value::String(self.text()),
            scalar => {
                let text = self.text();
                let text = text.trim();
                match scalar {
                    "int" | "i4" => text
                        .parse::<i32>()
                        .map(Value::Int)
                        .map_err(|_| RpcError::Parse(format!("invalid int {text:?}")))?,
                    "boolean" => match text {
                        "1" => Value::Bool(true),
                        "0" => Value::Bool(false),
                        _ => return Err(RpcError::Parse(format!("invalid boolean {text:?}"))),
                    },
                    "double" => text
                        .parse::<f64>()
                        .map(Value::Double)
                        .map_err(|_| RpcError::Parse(format!("invalid double {text:?}")))?,
                    "dateTime.iso8601" => Value::DateTime(text.to_string()),
                    "base64" => Value::Base64(text.to_string()),
                    other => return Err(RpcError::Parse(format!("unknown type <{other}>"))),
                }
            }
        };
        self.close(kind)?;
        Ok(value)
    }
}

fn unexpected(expected: &str, found: Option<Token>) -> RpcError {
    let found = match found {
        Some(Token::Open(name)) => format!("<{name}>"),
        Some(Token::Close(name)) => format!("</{name}>"),
        Some(Token::Text(text)) => format!("text {:?}", text.trim()),
        None => "end of document".to_string(),
    };
    RpcError::Parse(format!("expected {expected}, found {found}"))
}
