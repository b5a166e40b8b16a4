use anyhow::{bail, Result};
use std::time::Duration;

use crate::activation::reconciler;
use crate::catalog;
use crate::config::Config;
use crate::util::xdg;

pub fn execute(ide: &str, settle: Option<u64>) -> Result<()> {
    let component = match catalog::find(ide) {
        Some(component) => component,
        None => bail!(
            "unknown IDE '{}'; valid components: {}",
            ide,
            catalog::valid_ids()
        ),
    };

    let config = Config::load_default()?;
    let settle = Duration::from_secs(settle.unwrap_or(config.activation_settle_secs));
    let registry_path = xdg::registry_path()?;
    let log_dir = reconciler::log_dir();

    match reconciler::run(
        component.id,
        settle,
        config.log_retention,
        &registry_path,
        &log_dir,
    )? {
        Some(path) => tracing::info!("activation log written to {}", path.display()),
        None => tracing::debug!("extension activation disabled"),
    }

    Ok(())
}
