//! HTTP client port

use alloc::string::String;

use super::FetchError;

/// Response to a GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Body of a `200 OK` response, or the status as an error
    pub fn into_ok_body(self) -> Result<String, FetchError> {
        if self.status == 200 {
            Ok(self.body)
        } else {
            Err(FetchError::Http(self.status))
        }
    }
}

/// Blocking HTTPS GET
///
/// Implementations own TLS, redirects and timeouts, and report a missing
/// network link as [`FetchError::NotConnected`].
pub trait HttpClient {
    fn get(&mut self, url: &str) -> Result<HttpResponse, FetchError>;
}

impl<T: HttpClient + ?Sized> HttpClient for &mut T {
    fn get(&mut self, url: &str) -> Result<HttpResponse, FetchError> {
        (**self).get(url)
    }
}
