//! Direct access to fully-qualified addresses, outside any source chain.

use std::{fs::File, io::Read};

use url::Url;

use crate::error::{Error, Result};

/// Parse an absolute URL string.
pub fn parse_url(address: &str) -> Result<Url> {
    Url::parse(address).map_err(|source| Error::InvalidUrl {
        url: address.to_string(),
        source,
    })
}

/// Open an absolute address as a byte stream.
///
/// `http`/`https` addresses are fetched with a blocking GET and the
/// response body becomes the stream; `file` addresses open the local file
/// directly. No fallback chain applies: the address is already fully
/// qualified. Transport failures propagate unchanged, without retry.
pub fn url_as_stream(address: &str) -> Result<Box<dyn Read + Send>> {
    open_url(&parse_url(address)?)
}

/// Open an already-parsed address as a byte stream.
pub fn open_url(url: &Url) -> Result<Box<dyn Read + Send>> {
    match url.scheme() {
        "http" | "https" => {
            let response = reqwest::blocking::get(url.clone())
                .and_then(|response| response.error_for_status())
                .map_err(|source| Error::Fetch {
                    url: url.clone(),
                    source,
                })?;
            Ok(Box::new(response))
        }
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| Error::NotAFile(url.clone()))?;
            Ok(Box::new(File::open(path)?))
        }
        scheme => Err(Error::UnsupportedScheme {
            url: url.clone(),
            scheme: scheme.to_string(),
        }),
    }
}
