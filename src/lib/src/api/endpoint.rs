use url::Url;

use crate::error::RestoreError;

/// Joins the configured host with an absolute API path.
///
/// Any path already on the host is kept, so `http://proxy/restoredb` plus
/// `/api/upload/large/init` gives `http://proxy/restoredb/api/upload/large/init`.
pub fn url_from_host(host: &str, path: &str) -> Result<String, RestoreError> {
    let url = format!(
        "{}/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    // validate before handing it to reqwest
    Url::parse(&url)?;
    Ok(url)
}
