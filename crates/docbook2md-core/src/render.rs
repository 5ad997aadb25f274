//! Block renderer
//!
//! Walks the element tree depth-first and appends complete Markdown lines.
//! Running text is delegated to the inline renderer; unknown tags are
//! recorded in the per-document [`Diagnostics`].

use docbook_tree::Element;

use crate::diagnostics::Diagnostics;
use crate::inline::{decorate, flatten, normalize_whitespace};
use crate::markdown;
use crate::tag::TagKind;

/// Options for XML to Markdown conversion
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// Label of function synopsis headings, e.g. "Syntax (C):"
    pub synopsis_label: String,
    /// Heading of examples without a title
    pub example_caption: String,
    /// Key of package lines, e.g. "**Package:** stdlib"
    pub package_label: String,
    /// Fence language of code listings without a role
    pub default_code_language: String,
    /// Append the unknown tag table to the document
    pub unknown_tag_table: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            synopsis_label: "Syntax".to_string(),
            example_caption: "Example".to_string(),
            package_label: "Package".to_string(),
            default_code_language: "text".to_string(),
            unknown_tag_table: true,
        }
    }
}

/// Position of a node in the walk
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Heading depth of the node
    pub level: usize,
    /// Enclosing element (`None` for the document element)
    pub parent: Option<&'a Element>,
}

impl<'a> RenderContext<'a> {
    /// Context of the document element
    pub fn root() -> Self {
        Self {
            level: 1,
            parent: None,
        }
    }

    fn child_of(parent: &'a Element, level: usize) -> Self {
        Self {
            level,
            parent: Some(parent),
        }
    }
}

/// Children a container renders through its special handling
///
/// The generic child loop skips them but still emits their tails. The
/// special output goes where the first of them stood.
#[derive(Debug, Default)]
struct Consumed(Vec<usize>);

impl Consumed {
    fn none() -> Self {
        Self::default()
    }

    fn of(indices: impl IntoIterator<Item = usize>) -> Self {
        Self(indices.into_iter().collect())
    }

    fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    fn first(&self) -> Option<usize> {
        self.0.iter().min().copied()
    }
}

/// Renderer state for one document
pub struct Renderer<'o> {
    options: &'o ConverterOptions,
    lines: Vec<String>,
    diagnostics: Diagnostics,
}

impl<'o> Renderer<'o> {
    pub fn new(options: &'o ConverterOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Lines emitted so far
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the renderer, returning its lines and diagnostics
    pub fn finish(self) -> (Vec<String>, Diagnostics) {
        (self.lines, self.diagnostics)
    }

    /// Render a node and its subtree
    ///
    /// The node's own tail is left to the caller: tails belong to the
    /// enclosing container's child loop.
    pub fn render<'a>(&mut self, node: &'a Element, ctx: RenderContext<'a>) {
        let options = self.options;
        match TagKind::parse(&node.tag) {
            TagKind::Article => {
                self.render_children(node, ctx.level, &Consumed::none());
            }
            TagKind::Section => self.render_titled(node, ctx, None),
            TagKind::Example => {
                self.render_titled(node, ctx, Some(options.example_caption.as_str()));
            }
            TagKind::Title | TagKind::TitleAbbrev => {
                let text = self.flatten(node);
                self.heading(ctx.level, &text);
            }
            TagKind::Para => {
                let text = self.flatten(node);
                self.paragraph(&text);
            }
            TagKind::FuncSynopsis => {
                let label = match node.attr("role").map(capitalize) {
                    Some(role) if !role.is_empty() => {
                        format!("{} ({}):", options.synopsis_label, role)
                    }
                    _ => format!("{}:", options.synopsis_label),
                };
                self.heading(ctx.level + 1, &label);
                self.render_children(node, ctx.level + 1, &Consumed::none());
            }
            TagKind::FuncSynopsisInfo => {
                let package = node.position("package");
                let name = package.map(|i| self.flatten(&node.children[i]));
                self.render_children_with(node, ctx.level, &Consumed::of(package), |r| {
                    if let Some(name) = name {
                        r.package(&name);
                    }
                });
            }
            TagKind::FuncPrototype => self.render_prototype(node),
            TagKind::ProgramListing => {
                let lang = node
                    .attr("role")
                    .map(str::to_lowercase)
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| options.default_code_language.clone());
                self.record_nested(node);
                let code = node.text_content();
                self.block(markdown::code_block(&lang, trim_code(&code)));
            }
            TagKind::ItemizedList | TagKind::OrderedList | TagKind::VariableList => {
                self.ensure_blank_line();
                self.render_children(node, ctx.level, &Consumed::none());
                self.ensure_blank_line();
            }
            TagKind::ListItem => {
                let text = self.flatten(node);
                if !text.is_empty() {
                    let marker = list_marker(node, ctx.parent);
                    self.lines.push(format!("{marker} {text}"));
                }
            }
            TagKind::VarListEntry => self.render_varlistentry(node, ctx),
            TagKind::Term => {
                let text = self.flatten(node);
                if !text.is_empty() {
                    self.block(markdown::strong(&text));
                }
            }
            TagKind::Package => {
                let name = self.flatten(node);
                self.package(&name);
            }
            TagKind::Emphasis
            | TagKind::Literal
            | TagKind::Link
            | TagKind::Parameter
            | TagKind::Function => {
                self.record_nested(node);
                self.fragment(&decorate(node));
            }
            TagKind::FuncDef
            | TagKind::ParamDef
            | TagKind::Type
            | TagKind::Void
            | TagKind::VarArgs => {
                let text = self.flatten(node);
                self.fragment(&text);
            }
            TagKind::Unknown(name) => {
                let parent = ctx.parent.map(|p| p.tag.as_str());
                tracing::debug!(tag = %name, parent = parent.unwrap_or("none"), "Unknown tag");
                self.diagnostics.record(&name, &node.attributes, parent);
                self.render_children(node, ctx.level, &Consumed::none());
            }
        }
    }

    fn render_children<'a>(&mut self, node: &'a Element, level: usize, consumed: &Consumed) {
        self.render_children_with(node, level, consumed, |_| {});
    }

    /// Generic child loop, the single owner of block-level tails
    ///
    /// Output follows document order: the container's own leading text, then
    /// each child and its tail. `special` renders the consumed children and
    /// runs at the position of the first of them, or before everything else
    /// when nothing is consumed.
    fn render_children_with<'a>(
        &mut self,
        node: &'a Element,
        level: usize,
        consumed: &Consumed,
        special: impl FnOnce(&mut Self),
    ) {
        let anchor = consumed.first();
        let mut special = Some(special);
        if anchor.is_none()
            && let Some(render) = special.take()
        {
            render(self);
        }

        self.fragment(normalize_whitespace(&node.text).trim());
        for (index, child) in node.children.iter().enumerate() {
            if Some(index) == anchor {
                if let Some(render) = special.take() {
                    render(self);
                }
            } else if !consumed.contains(index) {
                self.render(child, RenderContext::child_of(node, level));
            }

            let tail = normalize_whitespace(&child.tail);
            let tail = tail.trim();
            // A line right after a bullet would continue that item
            if !tail.is_empty() && child.is("listitem") {
                self.ensure_blank_line();
            }
            self.fragment(tail);
        }
    }

    /// Flatten a subtree for a block line, reporting the unknown tags in it
    fn flatten(&mut self, node: &Element) -> String {
        self.record_nested(node);
        flatten(node)
    }

    /// Record unknown tags below a node whose subtree is not walked block-wise
    fn record_nested(&mut self, node: &Element) {
        for child in &node.children {
            if let TagKind::Unknown(name) = TagKind::parse(&child.tag) {
                tracing::debug!(tag = %name, parent = %node.tag, "Unknown inline tag");
                self.diagnostics
                    .record(&name, &child.attributes, Some(node.tag.as_str()));
            }
            self.record_nested(child);
        }
    }

    /// Section-like container: heading from its own title, children one level deeper
    fn render_titled<'a>(
        &mut self,
        node: &'a Element,
        ctx: RenderContext<'a>,
        fallback: Option<&str>,
    ) {
        let title = node.position("title");
        // A short title only duplicates the full one
        let abbrev = title.and(node.position("titleabbrev"));

        if let Some(i) = abbrev {
            self.record_nested(&node.children[i]);
        }
        let caption = title
            .map(|i| self.flatten(&node.children[i]))
            .filter(|t| !t.is_empty())
            .or_else(|| fallback.map(str::to_string));

        let level = ctx.level + 1;
        let consumed = Consumed::of(title.into_iter().chain(abbrev));
        self.render_children_with(node, level, &consumed, |r| {
            if let Some(caption) = caption {
                r.heading(level, &caption);
            }
        });
    }

    fn render_prototype(&mut self, node: &Element) {
        self.record_nested(node);
        let funcdef = node.find("funcdef");
        let return_type = funcdef.map(leading_or_type).unwrap_or_default();
        let name = funcdef
            .and_then(|d| d.find("function"))
            .map(|f| normalize_whitespace(f.text.trim()))
            .unwrap_or_default();

        let mut params: Vec<String> = node
            .find_all("paramdef")
            .map(|p| {
                let ty = leading_or_type(p);
                let name = p
                    .find("parameter")
                    .map(|n| normalize_whitespace(n.text.trim()))
                    .unwrap_or_default();
                join_nonempty(&[ty, name], " ")
            })
            .filter(|p| !p.is_empty())
            .collect();
        if params.is_empty() && node.find("void").is_some() {
            params.push("void".to_string());
        }
        if node.find("varargs").is_some() {
            params.push("...".to_string());
        }

        if return_type.is_empty() && name.is_empty() && params.is_empty() {
            return;
        }

        let mut signature = String::new();
        if !return_type.is_empty() {
            signature.push_str(&return_type);
            signature.push(' ');
        }
        if !name.is_empty() {
            signature.push_str(&markdown::inline_code(&name));
        }
        signature.push('(');
        signature.push_str(&params.join(", "));
        signature.push(')');
        self.block(markdown::strong(&signature));
    }

    fn render_varlistentry<'a>(&mut self, node: &'a Element, ctx: RenderContext<'a>) {
        let terms: Vec<usize> = node
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is("term"))
            .map(|(i, _)| i)
            .collect();
        let item = node.position("listitem");

        let term_texts: Vec<String> = terms
            .iter()
            .map(|&i| self.flatten(&node.children[i]))
            .collect();
        let term = join_nonempty(&term_texts, ", ");
        let definition = item
            .map(|i| self.flatten(&node.children[i]))
            .unwrap_or_default();

        let consumed = Consumed::of(terms.into_iter().chain(item));
        self.render_children_with(node, ctx.level, &consumed, |r| {
            if term.is_empty() && definition.is_empty() {
                return;
            }
            r.ensure_blank_line();
            if !term.is_empty() {
                r.lines.push(markdown::strong(&term));
            }
            if !definition.is_empty() {
                r.lines.push(definition);
            }
            r.lines.push(String::new());
        });
    }

    fn heading(&mut self, depth: usize, text: &str) {
        if !text.is_empty() {
            self.block(markdown::heading(depth, text));
        }
    }

    fn paragraph(&mut self, text: &str) {
        if !text.is_empty() {
            self.block(text.to_string());
        }
    }

    fn package(&mut self, name: &str) {
        let options = self.options;
        self.block(markdown::key_value(&options.package_label, name));
    }

    /// A standalone block: blank line before and after
    fn block(&mut self, content: String) {
        self.ensure_blank_line();
        self.lines.push(content);
        self.lines.push(String::new());
    }

    /// A piece of running text; consecutive fragments form one paragraph
    fn fragment(&mut self, text: &str) {
        if !text.is_empty() {
            self.lines.push(text.to_string());
        }
    }

    fn ensure_blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }
}

/// Bullet of a list item: numbered inside ordered lists, `-` elsewhere
fn list_marker(item: &Element, parent: Option<&Element>) -> String {
    match parent {
        Some(list) if list.is("orderedlist") => {
            let number = list
                .children
                .iter()
                .take_while(|c| !std::ptr::eq(*c, item))
                .filter(|c| c.is("listitem"))
                .count()
                + 1;
            format!("{number}.")
        }
        _ => "-".to_string(),
    }
}

/// Type of a `funcdef`/`paramdef`: its leading text, else a `type` child
fn leading_or_type(node: &Element) -> String {
    let leading = normalize_whitespace(node.text.trim());
    if !leading.is_empty() {
        return leading;
    }
    node.find("type").map(flatten).unwrap_or_default()
}

fn join_nonempty(parts: &[String], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

/// First letter upper-cased, the rest lower-cased
fn capitalize(s: &str) -> String {
    let mut chars = s.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Drop blank lines around a code body, keeping the first line's indentation
fn trim_code(code: &str) -> &str {
    let code = code.trim_end();
    match code.find(|c: char| !c.is_whitespace()) {
        Some(first) => {
            let start = code[..first].rfind('\n').map_or(0, |nl| nl + 1);
            &code[start..]
        }
        None => "",
    }
}
