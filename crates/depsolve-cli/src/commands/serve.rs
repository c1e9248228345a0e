//! Handler for `depsolve serve`.

use std::net::SocketAddr;
use std::sync::Arc;

use depsolve_core::config::GlobalConfig;
use depsolve_registry::RegistryClient;
use depsolve_resolver::service::ResolutionService;
use depsolve_util::errors::DepsolveError;
use depsolve_util::progress;
use miette::Result;

pub async fn exec(registry: Arc<dyn RegistryClient>, config: &GlobalConfig, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind.parse().map_err(|e| DepsolveError::Config {
        message: format!("Invalid bind address `{bind}`: {e}"),
    })?;
    let service = Arc::new(ResolutionService::from_config(registry, &config.resolver));

    progress::status("Listening", &format!("http://{addr}"));
    depsolve_server::serve(addr, service).await
}
