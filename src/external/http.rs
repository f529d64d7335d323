use super::Error;
use reqwest::blocking::Client;

pub trait Fetch {
    /// Body of a successful `GET url`.
    fn get(&self, url: &str) -> Result<Vec<u8>, Error>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, Error> {
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, Error> {
        tracing::debug!(%url, "downloading");
        let to_error = |source| Error::Http {
            url: url.to_owned(),
            source,
        };
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(to_error)?;
        let body = response.bytes().map_err(to_error)?;
        Ok(body.to_vec())
    }
}
