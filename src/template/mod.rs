pub(crate) mod compile;
pub(crate) mod model;
pub(crate) mod parse;
pub(crate) mod registry;
pub(crate) mod render;
pub(crate) mod validate;
