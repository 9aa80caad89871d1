//! Streaming endpoint derivation.

use url::Url;

use crate::error::{Error, Result};

/// Derive the streaming URL from the host application's origin.
///
/// The scheme is upgraded (`http` to `ws`, `https` to `wss`); `ws`/`wss`
/// origins are kept as-is. `path` replaces the origin's path.
///
/// # Errors
///
/// Returns an error if the origin does not parse or uses another scheme.
pub fn stream_url(origin: &str, path: &str) -> Result<String> {
    let mut url = Url::parse(origin)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::UnsupportedScheme(scheme.to_string()))?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.into())
}
