//! The default scripting language driver.
//!
//! Scripts use a small XML dialect inside a `<script>` envelope:
//! - `#{property}` binds a property value as a placeholder;
//! - `<if test="a != null and b == null">...</if>` keeps its body when every comparison holds;
//! - `<trim prefix=".." suffix=".." prefixOverrides="a|b" suffixOverrides=",">` strips the listed
//!   tokens from the ends of its body and wraps what is left;
//! - `<set>` and `<where>` are the usual trim shorthands.
//!
//! A `<` that does not open one of these tags is plain text, so filters like `age < #{age}` need
//! no escaping. `&lt;`, `&gt;` and `&amp;` are decoded in text and attributes.

use std::sync::Arc;

use sqldef_core::{
    BoundSql, DefResult, DefinitionError, LanguageDriver, ParamValue, PropertySource, SqlSource,
};

use crate::Placeholder;

pub const SCRIPT_OPEN: &str = "<script>";
pub const SCRIPT_CLOSE: &str = "</script>";

const TAGS: &[&str] = &["if", "trim", "set", "where"];

/// Parses enveloped scripts into `SqlSource`s rendering placeholders in one style.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlLanguageDriver {
    placeholder: Placeholder,
}

impl XmlLanguageDriver {
    pub fn new(placeholder: Placeholder) -> Self {
        Self { placeholder }
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }
}

impl LanguageDriver for XmlLanguageDriver {
    fn create_sql_source(&self, script: &str) -> DefResult<Arc<dyn SqlSource>> {
        let body = strip_envelope(script);
        let nodes = Parser::new(body).parse_nodes(None)?;
        if nodes.iter().all(|n| matches!(n, SqlNode::Text(_))) {
            let mut ctx = StaticContext::default();
            for node in &nodes {
                if let SqlNode::Text(segments) = node {
                    ctx.push_text(segments, self.placeholder);
                }
            }
            Ok(Arc::new(StaticSqlSource {
                sql: normalize_whitespace(&ctx.sql),
                bindings: ctx.bindings,
            }))
        } else {
            Ok(Arc::new(DynamicSqlSource {
                nodes,
                placeholder: self.placeholder,
            }))
        }
    }
}

fn strip_envelope(script: &str) -> &str {
    let trimmed = script.trim();
    match trimmed
        .strip_prefix(SCRIPT_OPEN)
        .and_then(|s| s.strip_suffix(SCRIPT_CLOSE))
    {
        Some(body) => body,
        None => trimmed,
    }
}

/// A script without dynamic elements: SQL fixed at build time, values looked up per call.
#[derive(Debug, Clone)]
struct StaticSqlSource {
    sql: String,
    bindings: Vec<String>,
}

impl SqlSource for StaticSqlSource {
    fn bound_sql(&self, params: &dyn PropertySource) -> DefResult<BoundSql> {
        let parameters = self
            .bindings
            .iter()
            .map(|name| Ok((name.clone(), lookup(params, name)?)))
            .collect::<DefResult<Vec<_>>>()?;
        Ok(BoundSql {
            sql: self.sql.clone(),
            parameters,
        })
    }
}

#[derive(Default)]
struct StaticContext {
    sql: String,
    bindings: Vec<String>,
}

impl StaticContext {
    fn push_text(&mut self, segments: &[Segment], placeholder: Placeholder) {
        for segment in segments {
            match segment {
                Segment::Literal(s) => self.sql.push_str(s),
                Segment::Binding(name) => {
                    self.bindings.push(name.clone());
                    self.sql.push_str(&placeholder.nth(self.bindings.len()));
                }
            }
        }
    }
}

/// A script with `<if>`/`<trim>` elements, evaluated against the parameters on every call.
#[derive(Debug, Clone)]
struct DynamicSqlSource {
    nodes: Vec<SqlNode>,
    placeholder: Placeholder,
}

impl SqlSource for DynamicSqlSource {
    fn bound_sql(&self, params: &dyn PropertySource) -> DefResult<BoundSql> {
        let mut ctx = DynamicContext {
            sql: String::new(),
            parameters: Vec::new(),
            params,
            placeholder: self.placeholder,
        };
        for node in &self.nodes {
            node.apply(&mut ctx)?;
        }
        Ok(BoundSql {
            sql: normalize_whitespace(&ctx.sql),
            parameters: ctx.parameters,
        })
    }
}

struct DynamicContext<'a> {
    sql: String,
    parameters: Vec<(String, ParamValue)>,
    params: &'a dyn PropertySource,
    placeholder: Placeholder,
}

fn lookup(params: &dyn PropertySource, name: &str) -> DefResult<ParamValue> {
    params
        .property(name)
        .ok_or_else(|| DefinitionError::UnknownProperty {
            name: name.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Binding(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Comparison {
    property: String,
    is_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Trim {
    prefix: String,
    suffix: String,
    prefix_overrides: Vec<String>,
    suffix_overrides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum SqlNode {
    Text(Vec<Segment>),
    If {
        test: Vec<Comparison>,
        body: Vec<SqlNode>,
    },
    Trim {
        trim: Trim,
        body: Vec<SqlNode>,
    },
}

impl SqlNode {
    fn apply(&self, ctx: &mut DynamicContext<'_>) -> DefResult<()> {
        match self {
            SqlNode::Text(segments) => {
                for segment in segments {
                    match segment {
                        Segment::Literal(s) => ctx.sql.push_str(s),
                        Segment::Binding(name) => {
                            let value = lookup(ctx.params, name)?;
                            ctx.parameters.push((name.clone(), value));
                            let ph = ctx.placeholder.nth(ctx.parameters.len());
                            ctx.sql.push_str(&ph);
                        }
                    }
                }
            }
            SqlNode::If { test, body } => {
                let mut holds = true;
                for cmp in test {
                    let value = lookup(ctx.params, &cmp.property)?;
                    if value.is_null() != cmp.is_null {
                        holds = false;
                        break;
                    }
                }
                if holds {
                    for node in body {
                        node.apply(ctx)?;
                    }
                }
            }
            SqlNode::Trim { trim, body } => {
                let outer = std::mem::take(&mut ctx.sql);
                for node in body {
                    node.apply(ctx)?;
                }
                let inner = std::mem::replace(&mut ctx.sql, outer);
                if let Some(content) = trim.apply(&inner) {
                    ctx.sql.push(' ');
                    ctx.sql.push_str(&content);
                    ctx.sql.push(' ');
                }
            }
        }
        Ok(())
    }
}

impl Trim {
    fn set() -> Self {
        Self {
            prefix: "set".to_string(),
            suffix: String::new(),
            prefix_overrides: Vec::new(),
            suffix_overrides: vec![",".to_string()],
        }
    }

    fn where_clause() -> Self {
        Self {
            prefix: "where".to_string(),
            suffix: String::new(),
            prefix_overrides: vec!["and ".to_string(), "or ".to_string()],
            suffix_overrides: Vec::new(),
        }
    }

    /// `None` when the body renders to nothing, so the prefix is dropped as well.
    fn apply(&self, body: &str) -> Option<String> {
        let mut content = body.trim();
        if content.is_empty() {
            return None;
        }
        for o in &self.prefix_overrides {
            if content.len() >= o.len()
                && content.is_char_boundary(o.len())
                && content[..o.len()].eq_ignore_ascii_case(o)
            {
                content = content[o.len()..].trim_start();
                break;
            }
        }
        for o in &self.suffix_overrides {
            if let Some(cut) = content.len().checked_sub(o.len()) {
                if content.is_char_boundary(cut) && content[cut..].eq_ignore_ascii_case(o) {
                    content = content[..cut].trim_end();
                    break;
                }
            }
        }
        let mut out = self.prefix.clone();
        if out.ends_with(|c: char| c.is_alphanumeric()) {
            out.push(' ');
        }
        out.push_str(content);
        if self.suffix.starts_with(|c: char| c.is_alphanumeric()) {
            out.push(' ');
        }
        out.push_str(&self.suffix);
        Some(out)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Parse nodes until `closing` (or end of input when `None`).
    fn parse_nodes(&mut self, closing: Option<&str>) -> DefResult<Vec<SqlNode>> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        loop {
            if self.pos >= self.input.len() {
                flush_text(&mut text, &mut nodes)?;
                return match closing {
                    None => Ok(nodes),
                    Some(tag) => Err(DefinitionError::script(format!("unclosed <{tag}>"))),
                };
            }
            let rest = self.rest();
            if let Some(name) = closing_tag(rest) {
                flush_text(&mut text, &mut nodes)?;
                return match closing {
                    Some(tag) if tag == name => {
                        self.pos += name.len() + 3;
                        Ok(nodes)
                    }
                    _ => Err(DefinitionError::script(format!("unexpected </{name}>"))),
                };
            }
            if let Some(name) = opening_tag(rest) {
                flush_text(&mut text, &mut nodes)?;
                let end = tag_end(rest)
                    .ok_or_else(|| DefinitionError::script(format!("unterminated <{name}")))?;
                let attrs = parse_attributes(&rest[1 + name.len()..end])?;
                self.pos += end + 1;
                let body = self.parse_nodes(Some(name))?;
                nodes.push(build_element(name, &attrs, body)?);
                continue;
            }
            let ch = rest.chars().next().unwrap_or_default();
            text.push(ch);
            self.pos += ch.len_utf8();
        }
    }
}

fn opening_tag(rest: &str) -> Option<&'static str> {
    let after = rest.strip_prefix('<')?;
    TAGS.iter().copied().find(|tag| {
        after.starts_with(tag)
            && after[tag.len()..]
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c.is_whitespace())
    })
}

/// Byte offset of the `>` closing an opening tag, skipping quoted attribute values.
fn tag_end(rest: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, ch) in rest.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            '>' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn closing_tag(rest: &str) -> Option<&'static str> {
    let after = rest.strip_prefix("</")?;
    TAGS.iter()
        .copied()
        .find(|tag| after.starts_with(tag) && after[tag.len()..].starts_with('>'))
}

fn flush_text(text: &mut String, nodes: &mut Vec<SqlNode>) -> DefResult<()> {
    if !text.is_empty() {
        nodes.push(SqlNode::Text(parse_segments(&unescape(text))?));
        text.clear();
    }
    Ok(())
}

fn parse_segments(text: &str) -> DefResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("#{") {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| DefinitionError::script("unterminated #{ binding"))?;
        let name = after[..end].trim();
        if name.is_empty() {
            return Err(DefinitionError::script("empty #{} binding"));
        }
        segments.push(Segment::Binding(name.to_string()));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

fn parse_attributes(raw: &str) -> DefResult<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| DefinitionError::script(format!("malformed attribute `{rest}`")))?;
        let name = rest[..eq].trim().to_string();
        let value_part = rest[eq + 1..].trim_start();
        let value_part = value_part
            .strip_prefix('"')
            .ok_or_else(|| DefinitionError::script(format!("unquoted attribute `{name}`")))?;
        let close = value_part
            .find('"')
            .ok_or_else(|| DefinitionError::script(format!("unterminated attribute `{name}`")))?;
        attrs.push((name, unescape(&value_part[..close])));
        rest = value_part[close + 1..].trim_start();
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn overrides(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split('|')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

fn build_element(
    name: &str,
    attrs: &[(String, String)],
    body: Vec<SqlNode>,
) -> DefResult<SqlNode> {
    match name {
        "if" => {
            let test = attr(attrs, "test")
                .ok_or_else(|| DefinitionError::script("<if> requires a test attribute"))?;
            Ok(SqlNode::If {
                test: parse_test(test)?,
                body,
            })
        }
        "set" => Ok(SqlNode::Trim {
            trim: Trim::set(),
            body,
        }),
        "where" => Ok(SqlNode::Trim {
            trim: Trim::where_clause(),
            body,
        }),
        "trim" => Ok(SqlNode::Trim {
            trim: Trim {
                prefix: attr(attrs, "prefix").unwrap_or_default().to_string(),
                suffix: attr(attrs, "suffix").unwrap_or_default().to_string(),
                prefix_overrides: overrides(attr(attrs, "prefixOverrides")),
                suffix_overrides: overrides(attr(attrs, "suffixOverrides")),
            },
            body,
        }),
        other => Err(DefinitionError::script(format!("unsupported element <{other}>"))),
    }
}

/// `a != null and b == null`
fn parse_test(test: &str) -> DefResult<Vec<Comparison>> {
    test.split(" and ")
        .map(|clause| {
            let clause = clause.trim();
            let (lhs, rhs, is_null) = if let Some((lhs, rhs)) = clause.split_once("!=") {
                (lhs, rhs, false)
            } else if let Some((lhs, rhs)) = clause.split_once("==") {
                (lhs, rhs, true)
            } else {
                return Err(unsupported_test(clause));
            };
            let property = lhs.trim();
            if rhs.trim() != "null" || property.is_empty() {
                return Err(unsupported_test(clause));
            }
            Ok(Comparison {
                property: property.to_string(),
                is_null,
            })
        })
        .collect()
}

fn unsupported_test(clause: &str) -> DefinitionError {
    DefinitionError::script(format!(
        "unsupported test `{clause}`; expected `<property> != null` or `<property> == null`"
    ))
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Collapse whitespace runs outside single-quoted literals.
fn normalize_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut pending_space = false;
    for ch in sql.chars() {
        if in_literal {
            out.push(ch);
            if ch == '\'' {
                in_literal = false;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if ch == '\'' {
            in_literal = true;
        }
        out.push(ch);
    }
    out
}
