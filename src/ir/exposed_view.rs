//! Public surface of a parsed module
//!
//! `ExposedView` borrows from a [`ParsedModule`] and filters its declarations
//! through the module header's `exposing` list. Views are recomputed on every
//! request and never cached.

use super::elm_module::{CustomType, Exposing, FunctionDeclaration, ParsedModule};

/// Read-only projection of a module restricted to what it exposes.
#[derive(Debug, Clone, Copy)]
pub struct ExposedView<'a> {
    module: &'a ParsedModule,
}

impl<'a> ExposedView<'a> {
    pub fn new(module: &'a ParsedModule) -> Self {
        Self { module }
    }

    fn exposing(self) -> &'a Exposing {
        &self.module.exposing
    }

    /// Exposed functions (and ports) in declaration order.
    pub fn functions(self) -> impl Iterator<Item = &'a FunctionDeclaration> + 'a {
        let exposing = self.exposing();
        self.module
            .function_declarations
            .iter()
            .filter(move |f| exposing.exposes_value(&f.name))
    }

    /// Exposed custom types, whether or not their constructors are exposed.
    pub fn types(self) -> impl Iterator<Item = &'a CustomType> + 'a {
        let exposing = self.exposing();
        self.module
            .custom_types
            .iter()
            .filter(move |t| exposing.exposes_type(&t.name).is_some())
    }

    /// Constructors of exposed custom types whose constructors are exposed
    /// (`Type(..)` or `exposing (..)`), paired with the type that owns them.
    pub fn constructors(self) -> impl Iterator<Item = (&'a CustomType, &'a str)> + 'a {
        let exposing = self.exposing();
        self.types()
            .filter(move |t| exposing.exposes_type(&t.name) == Some(true))
            .flat_map(|t| t.constructors.iter().map(move |c| (t, c.name.as_str())))
    }
}
