//! Corosync Configuration Parser
//!
//! Line-oriented parser and serializer for the brace-delimited corosync
//! configuration language:
//!
//! ```text
//! # comment
//! totem {
//!     version: 2
//!     interface {
//!         ringnumber: 0
//!     }
//! }
//! ```
//!
//! Every parsed line keeps its original text, so exporting an unmodified
//! document reproduces the input exactly. Only items touched through the
//! mutation API are re-rendered. Sibling sections sharing a name are kept
//! as separate, ordered entries.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::report::{reports, ReportItem};

/// Indentation added per nesting level for newly created items
const INDENT_STEP: &str = "    ";

/// Structural parse failure; parsing stops at the first one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unable to parse corosync config: missing closing brace for section opened on line {line}")]
    MissingClosingBrace { line: usize },

    #[error("Unable to parse corosync config: unexpected closing brace on line {line}")]
    UnexpectedClosingBrace { line: usize },
}

impl ParseError {
    pub fn to_report_item(&self) -> ReportItem {
        match self {
            ParseError::MissingClosingBrace { line } => {
                reports::corosync_conf_missing_closing_brace(*line)
            }
            ParseError::UnexpectedClosingBrace { line } => {
                reports::corosync_conf_unexpected_closing_brace(*line)
            }
        }
    }
}

impl From<ParseError> for crate::Error {
    fn from(err: ParseError) -> Self {
        crate::Error::Library(vec![err.to_report_item()])
    }
}

/// A `key: value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    key: String,
    value: String,
    indent: String,
    eol: String,
    /// Original line text; dropped once the value is edited
    raw: Option<String>,
}

impl Directive {
    fn new(key: &str, value: &str, indent: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            indent: indent.to_string(),
            eol: "\n".to_string(),
            raw: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn set_value(&mut self, value: &str) {
        if self.value != value {
            self.value = value.to_string();
            self.raw = None;
        }
    }

    fn render(&self, out: &mut String) {
        match &self.raw {
            Some(raw) => out.push_str(raw),
            None => {
                out.push_str(&self.indent);
                out.push_str(&self.key);
                out.push_str(": ");
                out.push_str(&self.value);
                out.push_str(&self.eol);
            }
        }
    }

    fn ends_with_newline(&self) -> bool {
        match &self.raw {
            Some(raw) => raw.ends_with('\n'),
            None => self.eol.ends_with('\n'),
        }
    }

    fn terminate_line(&mut self) {
        match &mut self.raw {
            Some(raw) => raw.push('\n'),
            None => self.eol = "\n".to_string(),
        }
    }
}

/// One entry of a section body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Directive(Directive),
    Section(Section),
    /// Blank lines, comments and anything unrecognized, kept as-is
    Verbatim(String),
}

impl Item {
    fn render(&self, out: &mut String) {
        match self {
            Item::Directive(directive) => directive.render(out),
            Item::Section(section) => section.render(out),
            Item::Verbatim(text) => out.push_str(text),
        }
    }

    fn ends_with_newline(&self) -> bool {
        match self {
            Item::Directive(directive) => directive.ends_with_newline(),
            Item::Section(section) => section.ends_with_newline(),
            Item::Verbatim(text) => text.ends_with('\n'),
        }
    }

    fn terminate_line(&mut self) {
        match self {
            Item::Directive(directive) => directive.terminate_line(),
            Item::Section(section) => section.terminate_line(),
            Item::Verbatim(text) => text.push('\n'),
        }
    }
}

/// A named, brace-delimited block of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    items: Vec<Item>,
    indent: String,
    open_raw: Option<String>,
    close_raw: Option<String>,
    /// Added through the API rather than parsed
    created: bool,
}

impl Section {
    fn created(name: &str, indent: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
            indent: indent.to_string(),
            open_raw: None,
            close_raw: None,
            created: true,
        }
    }

    fn parsed(name: &str, indent: &str, open_raw: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
            indent: indent.to_string(),
            open_raw: Some(open_raw.to_string()),
            close_raw: None,
            created: false,
        }
    }

    fn root() -> Self {
        Self {
            name: String::new(),
            items: Vec::new(),
            indent: String::new(),
            open_raw: None,
            close_raw: None,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Whether this section was added through the API in this session
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// True if the section has no directives and no subsections
    pub fn is_empty(&self) -> bool {
        !self
            .items
            .iter()
            .any(|item| matches!(item, Item::Directive(_) | Item::Section(_)))
    }

    /// All direct subsections in document order
    pub fn all_sections(&self) -> impl Iterator<Item = &Section> {
        self.items.iter().filter_map(|item| match item {
            Item::Section(section) => Some(section),
            _ => None,
        })
    }

    /// Direct subsections with the given name, in document order
    pub fn sections<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Section> + 'a {
        self.all_sections().filter(move |section| section.name == name)
    }

    /// Mutable direct subsections with the given name, in document order
    pub fn sections_mut<'a>(&'a mut self, name: &'a str) -> impl Iterator<Item = &'a mut Section> + 'a {
        self.items.iter_mut().filter_map(move |item| match item {
            Item::Section(section) if section.name == name => Some(section),
            _ => None,
        })
    }

    /// First direct subsection with the given name
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.all_sections().find(|section| section.name == name)
    }

    /// First direct subsection with the given name, mutable
    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.items.iter_mut().find_map(|item| match item {
            Item::Section(section) if section.name == name => Some(section),
            _ => None,
        })
    }

    /// All directives as `(key, value)` pairs, in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|item| match item {
            Item::Directive(d) => Some((d.key.as_str(), d.value.as_str())),
            _ => None,
        })
    }

    /// Values of every directive named `key`, in document order
    pub fn attribute_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Effective value of `key`: the last occurrence wins
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .last()
    }

    /// Set `key` to `value`.
    ///
    /// The first occurrence is updated in place and later occurrences in this
    /// section are dropped. A missing key is appended after existing content.
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        let mut seen = false;
        self.items.retain_mut(|item| match item {
            Item::Directive(d) if d.key == key => {
                if seen {
                    false
                } else {
                    seen = true;
                    d.set_value(value);
                    true
                }
            }
            _ => true,
        });

        if !seen {
            let indent = self.child_indent();
            self.push_item(Item::Directive(Directive::new(key, value, &indent)));
        }
    }

    /// Remove every directive named `key`; returns how many were removed
    pub fn remove_attributes(&mut self, key: &str) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| !matches!(item, Item::Directive(d) if d.key == key));
        before - self.items.len()
    }

    /// Append a new, empty subsection after existing content
    pub fn add_section(&mut self, name: &str) -> &mut Section {
        let indent = self.child_indent();
        self.push_item(Item::Section(Section::created(name, &indent)));
        match self.items.last_mut() {
            Some(Item::Section(section)) => section,
            _ => unreachable!("section was just pushed"),
        }
    }

    /// Remove direct subsections matching `predicate`; returns how many were removed
    pub fn remove_sections_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Section) -> bool,
    {
        let before = self.items.len();
        self.items
            .retain(|item| !matches!(item, Item::Section(s) if predicate(s)));
        before - self.items.len()
    }

    fn push_item(&mut self, item: Item) {
        if let Some(last) = self.items.last_mut() {
            if !last.ends_with_newline() {
                last.terminate_line();
            }
        }
        self.items.push(item);
    }

    /// Indentation for new children: follow existing siblings, else one step deeper
    fn child_indent(&self) -> String {
        let sibling = self.items.iter().find_map(|item| match item {
            Item::Directive(d) => Some(d.indent.clone()),
            Item::Section(s) => Some(s.indent.clone()),
            Item::Verbatim(_) => None,
        });
        match sibling {
            Some(indent) => indent,
            None if self.is_root() => String::new(),
            None => format!("{}{}", self.indent, INDENT_STEP),
        }
    }

    fn is_root(&self) -> bool {
        self.open_raw.is_none() && !self.created
    }

    fn render(&self, out: &mut String) {
        match &self.open_raw {
            Some(raw) => out.push_str(raw),
            None => {
                out.push_str(&self.indent);
                out.push_str(&self.name);
                out.push_str(" {\n");
            }
        }
        self.render_items(out);
        match &self.close_raw {
            Some(raw) => out.push_str(raw),
            None => {
                out.push_str(&self.indent);
                out.push_str("}\n");
            }
        }
    }

    fn render_items(&self, out: &mut String) {
        for item in &self.items {
            item.render(out);
        }
    }

    fn ends_with_newline(&self) -> bool {
        match &self.close_raw {
            Some(raw) => raw.ends_with('\n'),
            None => true,
        }
    }

    fn terminate_line(&mut self) {
        if let Some(raw) = &mut self.close_raw {
            raw.push('\n');
        }
    }
}

/// A parsed corosync configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    root: Section,
}

impl ConfigDocument {
    /// Parse configuration text
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        let mut root = Section::root();
        // Open sections with the line they were opened on
        let mut stack: Vec<(Section, usize)> = Vec::new();

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let content = line.trim_end_matches(&['\n', '\r'][..]);
            let trimmed = content.trim();

            match classify(trimmed) {
                Line::Verbatim => {
                    current(&mut stack, &mut root).items.push(Item::Verbatim(line.to_string()));
                }
                Line::Open(name) => {
                    let section = Section::parsed(name, leading_whitespace(content), line);
                    stack.push((section, line_no));
                }
                Line::Close => {
                    let (mut section, _) = stack
                        .pop()
                        .ok_or(ParseError::UnexpectedClosingBrace { line: line_no })?;
                    section.close_raw = Some(line.to_string());
                    current(&mut stack, &mut root).items.push(Item::Section(section));
                }
                Line::Directive(key, value) => {
                    let directive = Directive {
                        key: key.to_string(),
                        value: value.to_string(),
                        indent: leading_whitespace(content).to_string(),
                        eol: line[content.len()..].to_string(),
                        raw: Some(line.to_string()),
                    };
                    current(&mut stack, &mut root).items.push(Item::Directive(directive));
                }
            }
        }

        if let Some((_, line)) = stack.last() {
            return Err(ParseError::MissingClosingBrace { line: *line });
        }

        Ok(Self { root })
    }

    /// Serialize back to text
    pub fn export(&self) -> String {
        let mut out = String::new();
        self.root.render_items(&mut out);
        out
    }

    /// Top-level pseudo-section holding all items
    pub fn root(&self) -> &Section {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Section {
        &mut self.root
    }

    /// Top-level sections with the given name, in document order
    pub fn sections<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Section> + 'a {
        self.root.sections(name)
    }

    /// Append a new top-level section after existing content
    pub fn add_section(&mut self, name: &str) -> &mut Section {
        self.root.add_section(name)
    }
}

impl FromStr for ConfigDocument {
    type Err = ParseError;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.export())
    }
}

enum Line<'a> {
    Verbatim,
    Open(&'a str),
    Close,
    Directive(&'a str, &'a str),
}

fn classify(trimmed: &str) -> Line<'_> {
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Verbatim;
    }
    if trimmed.starts_with('}') {
        return Line::Close;
    }
    if let Some(name) = trimmed.strip_suffix('{') {
        return Line::Open(name.trim());
    }
    // one-line sections are not supported
    if trimmed.contains('{') || trimmed.contains('}') {
        return Line::Verbatim;
    }
    match trimmed.split_once(':') {
        Some((key, value)) => Line::Directive(key.trim(), value.trim()),
        None => Line::Verbatim,
    }
}

fn current<'a>(stack: &'a mut [(Section, usize)], root: &'a mut Section) -> &'a mut Section {
    match stack.last_mut() {
        Some((section, _)) => section,
        None => root,
    }
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
