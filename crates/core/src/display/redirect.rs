//! Redirect display strategy: replaces the current document.

use url::Url;

use crate::error::{Error, Result};
use crate::platform::Platform;

pub fn navigate<P: Platform>(platform: &P, url: &Url) -> Result<()> {
	tracing::debug!(target: "paybridge.display", url = %url, "redirecting to checkout");
	platform.navigate(url).map_err(Error::Navigation)
}
