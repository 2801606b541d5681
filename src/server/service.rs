use may_minihttp::HttpService;
use std::io;
use std::sync::Arc;

use super::request::parse_request;
use super::response::write_response;
use crate::dispatcher::Dispatcher;

/// Default body limit, matching `http.max_body_bytes`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024;

/// `may_minihttp` service bridging the wire to a shared [`Dispatcher`].
///
/// One clone serves each connection; the dispatcher itself is shared.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

impl AppService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl HttpService for AppService {
    fn call(
        &mut self,
        req: may_minihttp::Request,
        res: &mut may_minihttp::Response,
    ) -> io::Result<()> {
        let response = match parse_request(req, self.max_body_bytes) {
            Ok(request) => self.dispatcher.dispatch(request),
            Err(rejection) => rejection.into_response(),
        };
        write_response(res, &response);
        Ok(())
    }
}
