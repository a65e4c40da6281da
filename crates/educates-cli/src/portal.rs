//! Locating a deployed training portal and opening it in a browser.

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::repository::ResourceRepository;

/// Suffix of the portal's administrator login page.
pub const ADMIN_PATH: &str = "/admin";

/// Resolve the public URL of a portal.
///
/// # Errors
///
/// Returns [`Error::PortalNotFound`] if the portal does not exist and
/// [`Error::PortalNotReady`] if the operator has not yet published its URL.
/// Only the portal's status is read, so a malformed spec does not matter.
pub async fn portal_url<R>(repository: &R, portal: &str, admin: bool) -> Result<String>
where
    R: ResourceRepository + ?Sized,
{
    let status = repository
        .get_training_portal_status(portal)
        .await?
        .ok_or_else(|| Error::PortalNotFound {
            portal: portal.to_string(),
        })?;

    let url = status.url().ok_or_else(|| Error::PortalNotReady {
        portal: portal.to_string(),
    })?;

    debug!(portal, url, "Resolved training portal URL");

    if admin {
        Ok(format!("{url}{ADMIN_PATH}"))
    } else {
        Ok(url.to_string())
    }
}

/// Command used to hand a URL to the platform's default browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opener {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl Opener {
    /// Opener for a platform named as in [`std::env::consts::OS`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for platforms without a known
    /// opener.
    pub fn for_platform(platform: &str, url: &str) -> Result<Self> {
        let (program, mut args) = match platform {
            "linux" => ("xdg-open", Vec::new()),
            "macos" => ("open", Vec::new()),
            "windows" => ("rundll32", vec!["url.dll,FileProtocolHandler".to_string()]),
            _ => {
                return Err(Error::UnsupportedPlatform {
                    platform: platform.to_string(),
                })
            }
        };
        args.push(url.to_string());
        Ok(Self { program, args })
    }

    /// Start the opener without waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the process cannot be spawned.
    pub fn spawn(&self) -> Result<()> {
        let url = self.args.last().cloned().unwrap_or_default();

        Command::new(self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Launch { url: url.clone(), source })?;

        info!(url = %url, "Opened training portal");
        Ok(())
    }
}

/// Open `url` with the current platform's default browser.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] or [`Error::Launch`].
pub fn open_url(url: &str) -> Result<()> {
    Opener::for_platform(std::env::consts::OS, url)?.spawn()
}
