pub(crate) mod fmt;
pub(crate) mod path;
