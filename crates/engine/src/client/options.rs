use std::time::Duration;

pub const DEFAULT_MAX_REDIRECTS: usize = 16;
pub const DEFAULT_MAX_RESPONSE_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Settings of a [`ClientConnection`](crate::client::ClientConnection).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub(crate) max_response_body_size: usize,
    pub(crate) max_redirects: usize,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) write_timeout: Option<Duration>,
    pub(crate) disable_header_names_normalizing: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_response_body_size: DEFAULT_MAX_RESPONSE_BODY_SIZE,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            read_timeout: None,
            write_timeout: None,
            disable_header_names_normalizing: false,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest response body that is buffered.
    pub fn max_response_body_size(mut self, size: usize) -> Self {
        self.max_response_body_size = size;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn disable_header_names_normalizing(mut self, disable: bool) -> Self {
        self.disable_header_names_normalizing = disable;
        self
    }
}
