//! Selector - The CSS selector subset used by queries and widget wiring.
//!
//! Supported grammar:
//!
//! ```text
//! list      := complex (',' complex)*
//! complex   := compound ((' ' | '>') compound)*
//! compound  := (tag | '*')? (#id | .class | [attr] | [attr op value] | :not(compound))*
//! op        := '=' | '~=' | '^=' | '$=' | '*='
//! ```
//!
//! Matching runs right to left from the candidate element, the way browsers
//! do it.

use super::registry::Document;
use crate::error::DomError;
use crate::types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    /// Whitespace-separated word list contains the value.
    Includes(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    negations: Vec<Compound>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else { return false };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if !self.ids.iter().all(|id| doc.attr(node, "id") == Some(id.as_str())) {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        if !self.attrs.iter().all(|a| attr_matches(doc.attr(node, &a.name), &a.op)) {
            return false;
        }
        !self.negations.iter().any(|n| n.matches(doc, node))
    }
}

fn attr_matches(value: Option<&str>, op: &AttrOp) -> bool {
    let Some(value) = value else { return false };
    match op {
        AttrOp::Exists => true,
        AttrOp::Equals(v) => value == v,
        AttrOp::Includes(v) => !v.is_empty() && value.split_whitespace().any(|w| w == v),
        AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
        AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
        AttrOp::Substring(v) => !v.is_empty() && value.contains(v.as_str()),
    }
}

/// One selector without commas: compounds left to right, with the
/// combinator joining `compounds[i]` and `compounds[i + 1]` at index `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.match_at(doc, node, self.compounds.len() - 1)
    }

    fn match_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.match_at(doc, p, index - 1)),
            Combinator::Descendant => {
                let mut cursor = doc.parent(node);
                while let Some(ancestor) = cursor {
                    if self.match_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    cursor = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        Parser::new(input).parse_list()
    }

    /// Check whether an element matches any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::Selector {
            selector: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), DomError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{expected}` at offset {}", self.pos)))
        }
    }

    /// Skip whitespace, returning whether any was skipped.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn ident(&mut self) -> Result<String, DomError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error(format!("expected a name at offset {start}")));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_list(&mut self) -> Result<SelectorList, DomError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.parse_complex()?);
            self.skip_ws();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(c) => return Err(self.error(format!("unexpected `{c}`"))),
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<Complex, DomError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected `{c}`"))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        if self.eat('*') {
            compound.universal = true;
        } else if self.peek().is_some_and(|c| c.is_alphabetic()) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.pos += 1;
                    let name = self.ident()?;
                    if name != "not" {
                        return Err(self.error(format!("unsupported pseudo-class `:{name}`")));
                    }
                    self.expect('(')?;
                    self.skip_ws();
                    let inner = self.parse_compound()?;
                    self.skip_ws();
                    self.expect(')')?;
                    compound.negations.push(inner);
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.error(format!("expected a selector at offset {}", self.pos)));
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, DomError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        if self.eat(']') {
            return Ok(AttrSelector {
                name,
                op: AttrOp::Exists,
            });
        }
        let prefix = match self.peek() {
            Some(c @ ('~' | '^' | '$' | '*')) => {
                self.pos += 1;
                Some(c)
            }
            _ => None,
        };
        self.expect('=')?;
        self.skip_ws();
        let value = self.attr_value()?;
        self.skip_ws();
        self.expect(']')?;
        let op = match prefix {
            None => AttrOp::Equals(value),
            Some('~') => AttrOp::Includes(value),
            Some('^') => AttrOp::Prefix(value),
            Some('$') => AttrOp::Suffix(value),
            Some(_) => AttrOp::Substring(value),
        };
        Ok(AttrSelector { name, op })
    }

    fn attr_value(&mut self) -> Result<String, DomError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                let value = self.chars[start..self.pos].iter().collect();
                self.expect(quote)?;
                Ok(value)
            }
            _ => self.ident(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let list = doc.create_element("ul");
        doc.set_attr(list, "id", "menu");
        doc.set_attr(list, "class", "nav main");
        let item = doc.create_element("li");
        doc.set_attr(item, "data-m-opt", "");
        doc.set_attr(item, "role", "option");
        let link = doc.create_element("a");
        doc.set_attr(link, "tabindex", "-1");
        doc.append_child(body, list);
        doc.append_child(list, item);
        doc.append_child(item, link);
        (doc, list, item, link)
    }

    fn matches(doc: &Document, node: NodeId, selector: &str) -> bool {
        SelectorList::parse(selector).unwrap().matches(doc, node)
    }

    #[test]
    fn test_simple_selectors() {
        let (doc, list, item, _) = setup();
        assert!(matches(&doc, list, "ul"));
        assert!(matches(&doc, list, "UL"));
        assert!(matches(&doc, list, "*"));
        assert!(matches(&doc, list, "#menu"));
        assert!(matches(&doc, list, ".nav.main"));
        assert!(!matches(&doc, list, ".nav.side"));
        assert!(matches(&doc, item, "[data-m-opt]"));
        assert!(matches(&doc, item, "[role=option]"));
        assert!(matches(&doc, item, "[role='option']"));
        assert!(matches(&doc, list, "[class~=main]"));
        assert!(matches(&doc, list, "[id^=me]"));
        assert!(!matches(&doc, list, "[id^='']"));
    }

    #[test]
    fn test_combinators() {
        let (doc, _, item, link) = setup();
        assert!(matches(&doc, link, "ul a"));
        assert!(matches(&doc, link, "li > a"));
        assert!(!matches(&doc, link, "ul > a"));
        assert!(matches(&doc, item, "body ul > li"));
        assert!(matches(&doc, link, "#menu   li>a"));
    }

    #[test]
    fn test_lists_and_negation() {
        let (doc, list, _, link) = setup();
        assert!(matches(&doc, list, "ol, ul, [data-m-list]"));
        assert!(!matches(&doc, link, "a:not([tabindex=\"-1\"])"));
        assert!(matches(&doc, list, "ul:not(.side)"));
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "ul >", "[", "a:hover", "div,", "#", "a[x=\"y]"] {
            assert!(SelectorList::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
