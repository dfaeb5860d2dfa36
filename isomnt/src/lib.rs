//! isomnt: mount and unmount ISO9660 images through Linux loop devices.

pub mod cli;
pub mod errors;
pub mod logging;
pub mod mounter;
pub mod preflight;

use anyhow::Context;
use cli::{Action, Cli};
use isomnt_hal::IsoHal;
use mounter::IsoMounter;

pub fn run<H: IsoHal + ?Sized>(cli: &Cli, hal: &H) -> anyhow::Result<()> {
    let action = cli.action().context("either -m or -u is required")?;
    let mounter = IsoMounter::new(hal).with_policy(cli.match_policy());
    mounter.ensure_root()?;

    match action {
        Action::Mount { image, target } => {
            let device = mounter.mount(&image, &target).with_context(|| {
                format!(
                    "failed to mount {} at {}",
                    image.display(),
                    target.display()
                )
            })?;
            println!(
                "Successfully mounted .iso image: {} ({})",
                image.display(),
                device.path.display()
            );
        }
        Action::Unmount { target } => {
            mounter
                .unmount(&target)
                .with_context(|| format!("failed to unmount {}", target.display()))?;
            println!("Unmounted .iso image from: {}", target.display());
        }
    }

    Ok(())
}
