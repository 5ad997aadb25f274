//! Recognized tag vocabulary

/// Kind of an element, resolved case-insensitively from its tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    // Document structure
    Article,
    Section,
    Title,
    TitleAbbrev,
    Para,

    // Function synopses
    FuncSynopsis,
    FuncSynopsisInfo,
    FuncPrototype,
    FuncDef,
    Function,
    ParamDef,
    Parameter,
    Type,
    Void,
    VarArgs,
    Package,

    // Examples and code
    Example,
    ProgramListing,

    // Lists
    ItemizedList,
    OrderedList,
    ListItem,
    VariableList,
    VarListEntry,
    Term,

    // Inline formatting
    Emphasis,
    /// `literal` or `code`
    Literal,
    Link,

    /// No rendering rule (reported in diagnostics)
    Unknown(String),
}

impl TagKind {
    /// Parse a tag kind from a tag name
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "article" => Self::Article,
            "section" => Self::Section,
            "title" => Self::Title,
            "titleabbrev" => Self::TitleAbbrev,
            "para" => Self::Para,
            "funcsynopsis" => Self::FuncSynopsis,
            "funcsynopsisinfo" => Self::FuncSynopsisInfo,
            "funcprototype" => Self::FuncPrototype,
            "funcdef" => Self::FuncDef,
            "function" => Self::Function,
            "paramdef" => Self::ParamDef,
            "parameter" => Self::Parameter,
            "type" => Self::Type,
            "void" => Self::Void,
            "varargs" => Self::VarArgs,
            "package" => Self::Package,
            "example" => Self::Example,
            "programlisting" => Self::ProgramListing,
            "itemizedlist" => Self::ItemizedList,
            "orderedlist" => Self::OrderedList,
            "listitem" => Self::ListItem,
            "variablelist" => Self::VariableList,
            "varlistentry" => Self::VarListEntry,
            "term" => Self::Term,
            "emphasis" => Self::Emphasis,
            "literal" | "code" => Self::Literal,
            "link" => Self::Link,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Canonical tag name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Article => "article",
            Self::Section => "section",
            Self::Title => "title",
            Self::TitleAbbrev => "titleabbrev",
            Self::Para => "para",
            Self::FuncSynopsis => "funcsynopsis",
            Self::FuncSynopsisInfo => "funcsynopsisinfo",
            Self::FuncPrototype => "funcprototype",
            Self::FuncDef => "funcdef",
            Self::Function => "function",
            Self::ParamDef => "paramdef",
            Self::Parameter => "parameter",
            Self::Type => "type",
            Self::Void => "void",
            Self::VarArgs => "varargs",
            Self::Package => "package",
            Self::Example => "example",
            Self::ProgramListing => "programlisting",
            Self::ItemizedList => "itemizedlist",
            Self::OrderedList => "orderedlist",
            Self::ListItem => "listitem",
            Self::VariableList => "variablelist",
            Self::VarListEntry => "varlistentry",
            Self::Term => "term",
            Self::Emphasis => "emphasis",
            Self::Literal => "literal",
            Self::Link => "link",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the tag starts a block of its own
    ///
    /// Flattening separates such children from their neighbours with a space.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Section
                | Self::Title
                | Self::TitleAbbrev
                | Self::Para
                | Self::FuncSynopsis
                | Self::FuncPrototype
                | Self::Example
                | Self::ProgramListing
                | Self::ItemizedList
                | Self::OrderedList
                | Self::ListItem
                | Self::VariableList
                | Self::VarListEntry
                | Self::Term
        )
    }
}
