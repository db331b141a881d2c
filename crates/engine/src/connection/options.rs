use crate::codec::RequestBodyOptions;
use crate::handler::ContinueHandler;
use crate::protocol::RequestHeader;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Settings of a served connection, built with chained setters:
///
/// ```
/// use h1_engine::connection::ServerOptions;
/// use std::time::Duration;
///
/// let options = ServerOptions::new()
///     .server_name("h1")
///     .idle_timeout(Some(Duration::from_secs(60)))
///     .max_request_body_size(1024 * 1024);
/// ```
#[derive(Clone)]
pub struct ServerOptions {
    pub(crate) stream_request_body: bool,
    pub(crate) get_only: bool,
    pub(crate) disable_pre_parse_form: bool,
    pub(crate) disable_keep_alive: bool,
    pub(crate) disable_header_names_normalizing: bool,
    pub(crate) no_default_server_header: bool,
    pub(crate) no_default_date: bool,
    pub(crate) no_default_content_type: bool,
    pub(crate) server_name: Vec<u8>,
    pub(crate) max_request_body_size: usize,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) write_timeout: Option<Duration>,
    pub(crate) continue_handler: Option<ContinueHandler>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            stream_request_body: false,
            get_only: false,
            disable_pre_parse_form: false,
            disable_keep_alive: false,
            disable_header_names_normalizing: false,
            no_default_server_header: false,
            no_default_date: false,
            no_default_content_type: false,
            server_name: b"h1-engine".to_vec(),
            max_request_body_size: DEFAULT_MAX_REQUEST_BODY_SIZE,
            read_timeout: None,
            idle_timeout: None,
            write_timeout: None,
            continue_handler: None,
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands bodies over the size limit to the handler as a stream instead of failing.
    pub fn stream_request_body(mut self, stream: bool) -> Self {
        self.stream_request_body = stream;
        self
    }

    /// Rejects every method but `GET` and `HEAD`.
    pub fn get_only(mut self, get_only: bool) -> Self {
        self.get_only = get_only;
        self
    }

    pub fn disable_pre_parse_form(mut self, disable: bool) -> Self {
        self.disable_pre_parse_form = disable;
        self
    }

    pub fn disable_keep_alive(mut self, disable: bool) -> Self {
        self.disable_keep_alive = disable;
        self
    }

    pub fn disable_header_names_normalizing(mut self, disable: bool) -> Self {
        self.disable_header_names_normalizing = disable;
        self
    }

    pub fn no_default_server_header(mut self, no_default: bool) -> Self {
        self.no_default_server_header = no_default;
        self
    }

    pub fn no_default_date(mut self, no_default: bool) -> Self {
        self.no_default_date = no_default;
        self
    }

    pub fn no_default_content_type(mut self, no_default: bool) -> Self {
        self.no_default_content_type = no_default;
        self
    }

    /// Value of the `Server` header added to every response.
    pub fn server_name(mut self, name: impl AsRef<[u8]>) -> Self {
        self.server_name = name.as_ref().to_vec();
        self
    }

    pub fn max_request_body_size(mut self, size: usize) -> Self {
        self.max_request_body_size = size;
        self
    }

    /// Deadline of every single read while a request is read.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// How long a kept-alive connection may wait for its next request.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Decides on `Expect: 100-continue` requests; without one every such request may continue.
    pub fn continue_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestHeader) -> bool + Send + Sync + 'static,
    {
        self.continue_handler = Some(Arc::new(handler));
        self
    }

    pub(crate) fn request_body_options(&self) -> RequestBodyOptions {
        RequestBodyOptions {
            max_body_size: self.max_request_body_size,
            stream_body: self.stream_request_body,
            get_only: self.get_only,
            pre_parse_form: !self.disable_pre_parse_form,
        }
    }

    pub(crate) fn accepts_continue(&self, header: &RequestHeader) -> bool {
        self.continue_handler.as_ref().is_none_or(|handler| handler(header))
    }
}

impl Debug for ServerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("stream_request_body", &self.stream_request_body)
            .field("get_only", &self.get_only)
            .field("disable_pre_parse_form", &self.disable_pre_parse_form)
            .field("disable_keep_alive", &self.disable_keep_alive)
            .field("disable_header_names_normalizing", &self.disable_header_names_normalizing)
            .field("no_default_server_header", &self.no_default_server_header)
            .field("no_default_date", &self.no_default_date)
            .field("no_default_content_type", &self.no_default_content_type)
            .field("server_name", &String::from_utf8_lossy(&self.server_name))
            .field("max_request_body_size", &self.max_request_body_size)
            .field("read_timeout", &self.read_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("continue_handler", &self.continue_handler.is_some())
            .finish()
    }
}
