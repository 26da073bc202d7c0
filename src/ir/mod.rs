//! Intermediate representation of parsed Elm modules

pub mod elm_module;
pub mod exposed_view;

pub use elm_module::{
    Constructor, CustomType, ExposedItem, Exposing, FunctionDeclaration, Import, ParsedModule, TypeAlias,
};
pub use exposed_view::ExposedView;
