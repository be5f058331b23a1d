pub(crate) mod apply;
pub(crate) mod builder;
pub(crate) mod efficiency;
pub(crate) mod plan;
pub(crate) mod target;
