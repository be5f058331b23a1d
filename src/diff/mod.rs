pub(crate) mod change;
pub(crate) mod engine;
pub(crate) mod impact;
