//! Client side of the engine: sending requests over an established
//! connection and reading the responses.
//!
//! Dialing, pooling and host selection are left to the caller. Anything that
//! can perform one request/response exchange implements [`Doer`], which is all
//! [`do_request_follow_redirects`] needs.

mod client_connection;
mod options;

pub use client_connection::ClientConnection;
pub use options::{ClientOptions, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RESPONSE_BODY_SIZE};

use crate::protocol::{ClientError, Request, Response};
use async_trait::async_trait;
use http::StatusCode;
use tracing::debug;
use url::Url;

/// Performs one request/response exchange.
#[async_trait]
pub trait Doer: Send {
    async fn do_request(&mut self, request: &mut Request, response: &mut Response) -> Result<(), ClientError>;
}

/// Whether `status` is a redirect that is followed.
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Points `request` at `url`: the target becomes the path and query, and the
/// `Host` header is taken from the url unless the request already has one.
pub fn set_request_url(request: &mut Request, url: &Url) {
    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    request.header.set_uri(target.as_bytes());

    if request.header.host().is_empty()
        && let Some(host) = url.host_str()
    {
        match url.port() {
            Some(port) => request.header.set_host(format!("{host}:{port}").as_bytes()),
            None => request.header.set_host(host.as_bytes()),
        }
    }
}

/// Sends `request` to `url`, following redirects up to `max_redirects` hops.
///
/// A relative `Location` is resolved against the url it was received from,
/// and the `Host` of the previous hop is dropped before the next one. Returns
/// the status of the final response, which is left in `response`.
pub async fn do_request_follow_redirects(
    doer: &mut dyn Doer,
    request: &mut Request,
    response: &mut Response,
    url: &str,
    max_redirects: usize,
) -> Result<StatusCode, ClientError> {
    let mut url = Url::parse(url)?;
    let mut redirects = 0;

    loop {
        set_request_url(request, &url);
        doer.do_request(request, response).await?;

        let status = response.status();
        if !is_redirect(status) {
            return Ok(status);
        }

        redirects += 1;
        if redirects > max_redirects {
            return Err(ClientError::TooManyRedirects { max: max_redirects });
        }

        let location = match response.header.get(b"Location") {
            Some(location) if !location.is_empty() => location,
            _ => return Err(ClientError::MissingLocation),
        };
        let location = std::str::from_utf8(location).map_err(ClientError::invalid_url)?;
        url = url.join(location)?;
        debug!(status = status.as_u16(), %url, "following redirect");

        request.header.remove(b"Host");
    }
}
