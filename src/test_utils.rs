use crate::models::{PdmAddress, PozoAddress, SmdaAddress, SsdlAddress};
use crate::session::Session;
use crate::table::Record;

use axum::{
    extract::{Form, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Query string or form parameters of a mock request.
pub(crate) type Params = HashMap<String, String>;

type Responder = Arc<dyn Fn(&Params) -> (u16, String) + Send + Sync>;
type Hits = Arc<Mutex<HashMap<String, usize>>>;

/// Convert a JSON object literal into a record.
pub(crate) fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// An HTTP backend serving canned responses on an ephemeral local port.
pub(crate) struct MockBackend {
    router: Router,
    hits: Hits,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            router: Router::new(),
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve GET requests to `path` with a response computed from the query parameters.
    pub(crate) fn get<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&Params) -> (u16, String) + Send + Sync + 'static,
    {
        let responder: Responder = Arc::new(f);
        let hits = self.hits.clone();
        let key = path.to_string();
        let handler = move |Query(params): Query<Params>| {
            let responder = responder.clone();
            let hits = hits.clone();
            let key = key.clone();
            async move {
                *hits.lock().unwrap().entry(key).or_insert(0) += 1;
                respond(responder(&params))
            }
        };
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Serve GET requests to `path` with a fixed JSON body.
    pub(crate) fn get_json(self, path: &str, status: u16, body: Value) -> Self {
        let body = body.to_string();
        self.get(path, move |_| (status, body.clone()))
    }

    /// Serve form POST requests to `path` with a response computed from the form fields.
    pub(crate) fn post<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(&Params) -> (u16, String) + Send + Sync + 'static,
    {
        let responder: Responder = Arc::new(f);
        let hits = self.hits.clone();
        let key = path.to_string();
        let handler = move |Form(params): Form<Params>| {
            let responder = responder.clone();
            let hits = hits.clone();
            let key = key.clone();
            async move {
                *hits.lock().unwrap().entry(key).or_insert(0) += 1;
                respond(responder(&params))
            }
        };
        self.router = self.router.route(path, post(handler));
        self
    }

    /// Start serving in the background.
    pub(crate) fn serve(self) -> MockServer {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(self.router.into_make_service());
        tokio::spawn(server);
        MockServer {
            url: Url::parse(&format!("http://{}/", addr)).unwrap(),
            hits: self.hits,
        }
    }
}

fn respond((status, body): (u16, String)) -> impl IntoResponse {
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
        body,
    )
}

/// A running [MockBackend].
pub(crate) struct MockServer {
    /// Base URL, with a trailing slash
    pub url: Url,
    hits: Hits,
}

impl MockServer {
    /// Number of requests received on `path`.
    pub(crate) fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub(crate) fn smda(&self) -> SmdaAddress {
        SmdaAddress::new(self.url.clone(), Session::anonymous())
    }

    pub(crate) fn pdm(&self, field: &str) -> PdmAddress {
        PdmAddress::new(self.url.clone(), Session::anonymous(), field)
    }

    pub(crate) fn ssdl(&self, field: &str) -> SsdlAddress {
        SsdlAddress::new(self.url.clone(), Session::anonymous(), field)
    }

    pub(crate) fn pozo(&self, field: &str) -> PozoAddress {
        PozoAddress::new(self.url.clone(), Session::anonymous(), field)
    }
}
