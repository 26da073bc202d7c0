//! Parsed representation of a single Elm module
//!
//! This is the AST handed out by the module cache. It only keeps what completion
//! and documentation lookup need: the module header, its imports and the
//! top-level declarations. Expression bodies are never stored.

/// Name an Elm module gets when the file has no `module ... exposing` header.
pub const DEFAULT_MODULE_NAME: &str = "Main";

/// A parsed Elm module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    /// Dotted module name, e.g. `Html.Attributes`
    pub name: String,

    /// What the module header exposes
    pub exposing: Exposing,

    /// Import clauses in source order
    pub imports: Vec<Import>,

    /// Top-level functions and ports in declaration order
    pub function_declarations: Vec<FunctionDeclaration>,

    /// Custom types (`type Color = Red | Green`) in declaration order
    pub custom_types: Vec<CustomType>,

    /// Type aliases in declaration order
    pub type_aliases: Vec<TypeAlias>,
}

impl ParsedModule {
    /// An empty module with the given name that exposes everything.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exposing: Exposing::All,
            imports: Vec::new(),
            function_declarations: Vec::new(),
            custom_types: Vec::new(),
            type_aliases: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.function_declarations.iter().find(|f| f.name == name)
    }

    pub fn custom_type(&self, name: &str) -> Option<&CustomType> {
        self.custom_types.iter().find(|t| t.name == name)
    }

    pub fn type_alias(&self, name: &str) -> Option<&TypeAlias> {
        self.type_aliases.iter().find(|t| t.name == name)
    }

    /// Finds the custom type that declares constructor `name`.
    pub fn type_of_constructor(&self, name: &str) -> Option<&CustomType> {
        self.custom_types
            .iter()
            .find(|t| t.constructors.iter().any(|c| c.name == name))
    }
}

/// An `exposing (...)` list, either on a module header or an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exposing {
    /// `exposing (..)`
    All,
    /// `exposing (a, B, C(..))`
    Explicit(Vec<ExposedItem>),
}

impl Exposing {
    pub fn exposes_value(&self, name: &str) -> bool {
        match self {
            Exposing::All => true,
            Exposing::Explicit(items) => items
                .iter()
                .any(|item| matches!(item, ExposedItem::Value(n) if n == name)),
        }
    }

    /// Returns `Some(true)` when the type is exposed together with its
    /// constructors, `Some(false)` when only the type name is exposed and
    /// `None` when the type is not exposed at all.
    pub fn exposes_type(&self, name: &str) -> Option<bool> {
        match self {
            Exposing::All => Some(true),
            Exposing::Explicit(items) => items.iter().find_map(|item| match item {
                ExposedItem::Type { name: n, constructors } if n == name => Some(*constructors),
                _ => None,
            }),
        }
    }
}

/// A single entry of an explicit exposing list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposedItem {
    /// A lower-case value or function
    Value(String),
    /// A type; `constructors` is true for `Type(..)`
    Type { name: String, constructors: bool },
    /// An infix operator such as `(|>)`
    Operator(String),
}

/// `import Module.Name as Alias exposing (..)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub alias: Option<String>,
    pub exposing: Option<Exposing>,
}

impl Import {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            alias: None,
            exposing: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    /// Text after the `:` of the type annotation, whitespace-normalized
    pub type_annotation: Option<String>,
    /// Body of the `{-| ... -}` doc comment, if any
    pub comment: Option<String>,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomType {
    pub name: String,
    pub constructors: Vec<Constructor>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAlias {
    pub name: String,
    pub comment: Option<String>,
}
