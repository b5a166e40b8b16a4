use anyhow::{bail, Result};
use std::ffi::OsString;

use crate::activation::runtime;
use crate::catalog;
use crate::util::xdg;

pub fn execute(ide: &str, args: &[OsString]) -> Result<()> {
    let component = match catalog::find(ide) {
        Some(component) => component,
        None => bail!(
            "unknown IDE '{}'; valid components: {}",
            ide,
            catalog::valid_ids()
        ),
    };

    let registry_path = xdg::registry_path()?;
    runtime::run_wrapped(component.id, args, &registry_path)
}
