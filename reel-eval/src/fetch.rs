use std::io::Read;
use tracing::debug;

/// Downloads the content behind a URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Fetches over HTTP(S).
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        debug!(url, "downloading");
        let response = match ureq::get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(format!("HTTP status {}", code)),
            Err(ureq::Error::Transport(transport)) => return Err(transport.to_string()),
        };
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|err| err.to_string())?;
        Ok(body)
    }
}
