use std::sync::Arc;

use super::upstream::Upstream;
use crate::config::RunConfig;

#[derive(Clone)]
pub(crate) struct ProxyState {
    pub(crate) config: Arc<RunConfig>,
    pub(crate) upstream: Arc<dyn Upstream>,
}
