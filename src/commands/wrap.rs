use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::activation::registrar::{self, RegistrarPaths, Registration};
use crate::catalog;
use crate::ui;
use crate::util::xdg;

pub fn execute(ide: &str, path: Option<PathBuf>) -> Result<()> {
    let component = match catalog::find(ide) {
        Some(component) => component,
        None => bail!(
            "unknown IDE '{}'; valid components: {}",
            ide,
            catalog::valid_ids()
        ),
    };

    if component.is_cli() {
        bail!(
            "{} is a terminal editor and is not wrapped; only graphical IDEs are",
            component.id
        );
    }

    let launcher = match path {
        Some(path) => path,
        None => xdg::bin_dir()?.join(component.binary),
    };

    let paths = RegistrarPaths::from_xdg()?;
    match registrar::register(component, &launcher, &paths)? {
        Registration::Installed => {
            ui::success(
                "Wrapped",
                format!("{} launcher at {}", component.id, launcher.display()),
            );
        }
        Registration::AlreadyRegistered => {
            ui::info(format!("{} is already wrapped", component.id));
        }
    }

    Ok(())
}
