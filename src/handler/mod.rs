pub(crate) mod errors;
pub(crate) mod headers;
pub(crate) mod middleware;
pub(crate) mod proxy;
pub(crate) mod rewrite;
pub(crate) mod state;
pub(crate) mod upstream;
