//! Elm source parser
//!
//! The module cache only needs an opaque `parse(text) -> module | error`
//! function. [`ModuleParser`] is that seam; [`TreeSitterElmParser`] implements it
//! with the tree-sitter Elm grammar and lowers the concrete syntax tree into a
//! [`ParsedModule`].
//!
//! Tree-sitter always produces a tree, so "parse failure" is defined here: the
//! module header is broken, or nothing at all could be recognized. Errors inside
//! individual declarations only drop that declaration, which keeps imports and
//! the header available while a file is being edited.

use thiserror::Error;
use tracing::{debug, trace};
use tree_sitter::{Node as TSNode, Parser, Tree};

use crate::ir::elm_module::{
    Constructor, CustomType, DEFAULT_MODULE_NAME, ExposedItem, Exposing, FunctionDeclaration, Import,
    ParsedModule, TypeAlias,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("source is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to load the Elm grammar: {0}")]
    Language(String),

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("malformed module header at {row}:{column}")]
    MalformedHeader { row: usize, column: usize },

    #[error("no recognizable Elm declarations")]
    Unrecognized,
}

/// Turns Elm source text into a [`ParsedModule`].
pub trait ModuleParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<ParsedModule, ParseError>;

    /// Decodes raw file bytes before parsing.
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedModule, ParseError> {
        let source = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
        self.parse(source)
    }
}

/// [`ModuleParser`] backed by `tree-sitter-elm`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterElmParser;

impl TreeSitterElmParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_tree(&self, source: &str) -> Result<Tree, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_elm::LANGUAGE.into())
            .map_err(|e| ParseError::Language(e.to_string()))?;
        parser.parse(source, None).ok_or(ParseError::NoTree)
    }
}

impl ModuleParser for TreeSitterElmParser {
    fn parse(&self, source: &str) -> Result<ParsedModule, ParseError> {
        let tree = self.parse_tree(source)?;
        lower_file(tree.root_node(), source)
    }
}

fn node_text<'a>(node: TSNode, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Collapses runs of whitespace so multi-line annotations read on one line.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn named_child_of_kind<'t>(node: TSNode<'t>, kind: &str) -> Option<TSNode<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|child| child.kind() == kind);
    found
}

fn lower_file(root: TSNode, source: &str) -> Result<ParsedModule, ParseError> {
    let mut module = ParsedModule::named(DEFAULT_MODULE_NAME);
    let mut recognized = 0usize;
    let mut first = true;

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let is_first = std::mem::replace(&mut first, false);
        match child.kind() {
            "module_declaration" => {
                if child.has_error() {
                    let pos = child.start_position();
                    return Err(ParseError::MalformedHeader { row: pos.row, column: pos.column });
                }
                let name = named_child_of_kind(child, "upper_case_qid").ok_or_else(|| {
                    let pos = child.start_position();
                    ParseError::MalformedHeader { row: pos.row, column: pos.column }
                })?;
                module.name = normalize_whitespace(node_text(name, source));
                module.exposing = named_child_of_kind(child, "exposing_list")
                    .map(|list| lower_exposing_list(list, source))
                    .unwrap_or(Exposing::All);
                recognized += 1;
            }
            "import_clause" => {
                if let Some(import) = lower_import(child, source) {
                    module.imports.push(import);
                    recognized += 1;
                }
            }
            "value_declaration" if !child.has_error() => {
                if let Some(function) = lower_value_declaration(child, source) {
                    module.function_declarations.push(function);
                    recognized += 1;
                }
            }
            "port_annotation" if !child.has_error() => {
                if let Some(name) = named_child_of_kind(child, "lower_case_identifier") {
                    module.function_declarations.push(FunctionDeclaration {
                        name: node_text(name, source).to_string(),
                        type_annotation: named_child_of_kind(child, "type_expression")
                            .map(|t| normalize_whitespace(node_text(t, source))),
                        comment: doc_comment_before(child, source),
                    });
                    recognized += 1;
                }
            }
            "type_declaration" if !child.has_error() => {
                if let Some(custom_type) = lower_type_declaration(child, source) {
                    module.custom_types.push(custom_type);
                    recognized += 1;
                }
            }
            "type_alias_declaration" if !child.has_error() => {
                if let Some(name) = named_child_of_kind(child, "upper_case_identifier") {
                    module.type_aliases.push(TypeAlias {
                        name: node_text(name, source).to_string(),
                        comment: doc_comment_before(child, source),
                    });
                    recognized += 1;
                }
            }
            "ERROR" if is_first && child.start_byte() == 0 && source.trim_start().starts_with("module") => {
                let pos = child.start_position();
                return Err(ParseError::MalformedHeader { row: pos.row, column: pos.column });
            }
            "block_comment" | "line_comment" | "type_annotation" => {}
            other => trace!("Skipping top-level {} node", other),
        }
    }

    if recognized == 0 && !source.trim().is_empty() && root.has_error() {
        debug!("Parse tree contains only errors");
        return Err(ParseError::Unrecognized);
    }

    Ok(module)
}

fn lower_exposing_list(node: TSNode, source: &str) -> Exposing {
    let mut items = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "double_dot" => return Exposing::All,
            "exposed_value" => items.push(ExposedItem::Value(normalize_whitespace(node_text(child, source)))),
            "exposed_type" => {
                if let Some(name) = named_child_of_kind(child, "upper_case_identifier") {
                    items.push(ExposedItem::Type {
                        name: node_text(name, source).to_string(),
                        constructors: named_child_of_kind(child, "exposed_union_constructors").is_some(),
                    });
                }
            }
            "exposed_operator" => {
                let text = node_text(child, source);
                let op = text.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
                items.push(ExposedItem::Operator(op.to_string()));
            }
            _ => {}
        }
    }
    Exposing::Explicit(items)
}

fn lower_import(node: TSNode, source: &str) -> Option<Import> {
    let name = named_child_of_kind(node, "upper_case_qid")?;
    let alias = named_child_of_kind(node, "as_clause")
        .and_then(|clause| named_child_of_kind(clause, "upper_case_identifier"))
        .map(|alias| node_text(alias, source).to_string());
    let exposing = named_child_of_kind(node, "exposing_list").map(|list| lower_exposing_list(list, source));

    Some(Import {
        module: normalize_whitespace(node_text(name, source)),
        alias,
        exposing,
    })
}

fn lower_value_declaration(node: TSNode, source: &str) -> Option<FunctionDeclaration> {
    // Destructuring declarations (`( a, b ) = ...`) have no function_declaration_left.
    let left = named_child_of_kind(node, "function_declaration_left")?;
    let name = node_text(named_child_of_kind(left, "lower_case_identifier")?, source).to_string();

    let annotation = node
        .prev_named_sibling()
        .filter(|prev| prev.kind() == "type_annotation")
        .filter(|prev| {
            named_child_of_kind(*prev, "lower_case_identifier")
                .is_some_and(|n| node_text(n, source) == name)
        });

    let type_annotation = annotation
        .and_then(|a| named_child_of_kind(a, "type_expression"))
        .map(|t| normalize_whitespace(node_text(t, source)));
    let comment = doc_comment_before(annotation.unwrap_or(node), source);

    Some(FunctionDeclaration { name, type_annotation, comment })
}

fn lower_type_declaration(node: TSNode, source: &str) -> Option<CustomType> {
    let name = node_text(named_child_of_kind(node, "upper_case_identifier")?, source).to_string();

    let mut constructors = Vec::new();
    let mut cursor = node.walk();
    for variant in node.named_children(&mut cursor).filter(|c| c.kind() == "union_variant") {
        if let Some(ctor) = named_child_of_kind(variant, "upper_case_identifier") {
            constructors.push(Constructor { name: node_text(ctor, source).to_string() });
        }
    }

    Some(CustomType {
        name,
        constructors,
        comment: doc_comment_before(node, source),
    })
}

/// Returns the body of a `{-| ... -}` comment directly preceding `node`.
fn doc_comment_before(node: TSNode, source: &str) -> Option<String> {
    let prev = node.prev_named_sibling()?;
    if prev.kind() != "block_comment" {
        return None;
    }
    let text = node_text(prev, source);
    let body = text.strip_prefix("{-|")?;
    let body = body.strip_suffix("-}").unwrap_or(body);
    Some(body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> ParsedModule {
        TreeSitterElmParser::new().parse(source).expect("source should parse")
    }

    #[test]
    fn test_module_header_and_imports() {
        let module = parse(indoc! {r#"
            module Page.Home exposing (view, Msg(..), Model)

            import Html exposing (div, text)
            import Html.Attributes as Attr
            import List

            view model =
                div [] []
        "#});

        assert_eq!(module.name, "Page.Home");
        assert_eq!(
            module.exposing,
            Exposing::Explicit(vec![
                ExposedItem::Value("view".to_string()),
                ExposedItem::Type { name: "Msg".to_string(), constructors: true },
                ExposedItem::Type { name: "Model".to_string(), constructors: false },
            ])
        );
        let imports: Vec<_> = module.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(imports, vec!["Html", "Html.Attributes", "List"]);
        assert_eq!(module.imports[1].alias.as_deref(), Some("Attr"));
        assert!(module.imports[0].exposing.is_some());
    }

    #[test]
    fn test_declarations_with_annotations_and_docs() {
        let module = parse(indoc! {r##"
            module Color exposing (..)

            {-| A color.
            -}
            type Color
                = Red
                | Green

            type alias Rgb =
                { r : Int, g : Int, b : Int }

            {-| Render as hex.
            -}
            toHex : Color -> String
            toHex color =
                "#fff"

            helper x =
                x
        "##});

        assert_eq!(module.name, "Color");
        assert_eq!(module.exposing, Exposing::All);

        let color = module.custom_type("Color").expect("Color type");
        let ctors: Vec<_> = color.constructors.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(ctors, vec!["Red", "Green"]);
        assert_eq!(color.comment.as_deref(), Some("A color."));

        assert!(module.type_alias("Rgb").is_some());

        let to_hex = module.function("toHex").expect("toHex");
        assert_eq!(to_hex.type_annotation.as_deref(), Some("Color -> String"));
        assert_eq!(to_hex.comment.as_deref(), Some("Render as hex."));

        let helper = module.function("helper").expect("helper");
        assert!(helper.type_annotation.is_none());
        assert!(helper.comment.is_none());
    }

    #[test]
    fn test_missing_header_defaults_to_main() {
        let module = parse("main =\n    42\n");
        assert_eq!(module.name, DEFAULT_MODULE_NAME);
        assert_eq!(module.function_declarations.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let result = TreeSitterElmParser::new().parse_bytes(&[0xff, 0xfe, 0x00]);
        assert_eq!(result, Err(ParseError::InvalidUtf8));
    }
}
