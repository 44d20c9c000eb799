use crate::{
    contract::Interaction,
    data::RequestData,
    error::Error,
    mismatch::{InteractionResult, Mismatch, MismatchReport},
    util,
};
use futures::FutureExt;
use hyper::{
    body,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use serde_json::json;
use std::{
    convert::Infallible,
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{debug, error, warn};

#[derive(Debug)]
struct RegisteredInteraction {
    interaction: Interaction,
    received: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    interactions: Vec<RegisteredInteraction>,
    unexpected: Vec<(RequestData, Vec<Mismatch>)>,
}

impl MockState {
    pub(crate) fn register(&mut self, interaction: Interaction) {
        self.interactions.push(RegisteredInteraction {
            interaction,
            received: 0,
        });
    }

    pub(crate) fn interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter().map(|registered| &registered.interaction)
    }

    /// Every registered interaction must have been received exactly once, and nothing else.
    pub(crate) fn report(&self) -> MismatchReport {
        let interactions = self
            .interactions
            .iter()
            .map(|registered| {
                let interaction = &registered.interaction;
                let mismatches = match registered.received {
                    0 => vec![Mismatch::MissingRequest {
                        description: format!(
                            "{} {}",
                            interaction.request.method,
                            interaction.request.uri()
                        ),
                    }],
                    1 => Vec::new(),
                    _ => vec![Mismatch::UnexpectedRequest {
                        method: interaction.request.method.clone(),
                        uri: format!(
                            "{} (received {} times)",
                            interaction.request.uri(),
                            registered.received
                        ),
                    }],
                };

                InteractionResult {
                    description: interaction.description.clone(),
                    provider_state: interaction.provider_state.clone(),
                    mismatches,
                }
            })
            .collect();

        let unexpected = self
            .unexpected
            .iter()
            .flat_map(|(request, mismatches)| {
                std::iter::once(Mismatch::UnexpectedRequest {
                    method: request.method.clone(),
                    uri: request.uri.clone(),
                })
                .chain(mismatches.iter().cloned())
            })
            .collect();

        MismatchReport {
            interactions,
            unexpected,
        }
    }

    /// Finds the interaction answering `request`. When none does, the request is recorded as
    /// unexpected along with how it differs from interactions for the same path.
    fn match_request(&mut self, request: &RequestData) -> Option<&Interaction> {
        let position = self
            .interactions
            .iter()
            .position(|registered| registered.interaction.request.check(request).is_empty());

        match position {
            Some(position) => {
                let registered = &mut self.interactions[position];
                registered.received += 1;
                Some(&registered.interaction)
            }
            None => {
                let near_misses = self
                    .interactions
                    .iter()
                    .filter(|registered| registered.interaction.request.path == request.path())
                    .flat_map(|registered| registered.interaction.request.check(request))
                    .collect();
                self.unexpected.push((request.clone(), near_misses));
                None
            }
        }
    }
}

/// An HTTP server on its own thread and runtime, answering with the registered interactions.
#[derive(Debug)]
pub(crate) struct MockServer {
    port: u16,
    state: Arc<Mutex<MockState>>,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub(crate) fn start(port: u16) -> Result<Self, Error> {
        let listener =
            TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).map_err(Error::SetupFailed)?;
        listener.set_nonblocking(true).map_err(Error::SetupFailed)?;
        let port = listener.local_addr().map_err(Error::SetupFailed)?.port();

        let runtime = Runtime::new().map_err(Error::SetupFailed)?;
        let state = Arc::new(Mutex::new(MockState::default()));
        let server_state = state.clone();
        let (shutdown, shutdown_signal) = oneshot::channel::<()>();

        let join_handle = thread::Builder::new()
            .name(format!("mock-server-{}", port))
            .spawn(move || {
                runtime.block_on(async move {
                    let builder = match Server::from_tcp(listener) {
                        Ok(builder) => builder,
                        Err(e) => {
                            error!("Mock server couldn't use its listener: {}", e);
                            return;
                        }
                    };

                    let server = builder.serve(make_service_fn(move |_| {
                        let state = server_state.clone();
                        async move {
                            Ok::<_, Infallible>(service_fn(move |request| {
                                handle_request(state.clone(), request)
                            }))
                        }
                    }));

                    if let Err(e) = server
                        .with_graceful_shutdown(shutdown_signal.map(|_| ()))
                        .await
                    {
                        error!("Mock server error: {}", e);
                    }
                });
            })
            .map_err(Error::SetupFailed)?;

        debug!(port, "mock server listening");

        Ok(Self {
            port,
            state,
            shutdown: Some(shutdown),
            join_handle: Some(join_handle),
        })
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn state(&self) -> &Arc<Mutex<MockState>> {
        &self.state
    }

    pub(crate) fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // the server is already gone if the receiver was dropped
            let _ = shutdown.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                error!("Couldn't gracefully shutdown the mock server thread");
            }
            debug!(port = self.port, "mock server stopped");
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_request(
    state: Arc<Mutex<MockState>>,
    mut request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let response = match read_request_data(&mut request).await {
        Ok(request_data) => respond(&state, &request_data),
        Err(e) => Err(e),
    };

    Ok(response.unwrap_or_else(|e| {
        error!("Mock server failed to answer: {}", e);
        let mut response = Response::new(Body::from(json!({ "error": e.to_string() }).to_string()));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    }))
}

fn respond(state: &Mutex<MockState>, request_data: &RequestData) -> Result<Response<Body>, Error> {
    debug!(method = %request_data.method, uri = %request_data.uri, "mock server received request");

    let mut state = state.lock()?;

    let interaction = match state.match_request(request_data) {
        Some(interaction) => interaction,
        None => {
            warn!(method = %request_data.method, uri = %request_data.uri, "no interaction matches request");
            let body = json!({
                "error": "Unexpected request",
                "method": request_data.method,
                "uri": request_data.uri,
            });

            return Ok(Response::builder()
                .status(500)
                .header("content-type", "application/json")
                .body(body.to_string().into())?);
        }
    };

    let mut response_builder = Response::builder().status(interaction.response.status);

    if let Some(headers_mut) = response_builder.headers_mut() {
        util::put_headers(headers_mut, &interaction.response.headers)?;
    }

    let body = match &interaction.response.body {
        Some(body) => serde_json::to_string(body)?,
        None => String::new(),
    };

    Ok(response_builder.body(body.into())?)
}

async fn read_request_data(request: &mut Request<Body>) -> Result<RequestData, Error> {
    let method = request.method().to_string();
    let uri = request
        .uri()
        .path_and_query()
        .map(|path_and_query| path_and_query.to_string())
        .unwrap_or_else(|| request.uri().to_string());
    let headers = util::extract_headers(request.headers());

    let body = body::to_bytes(request.body_mut())
        .await
        .map_err(|_| Error::InvalidBody)?;

    Ok(RequestData {
        method,
        uri,
        headers,
        body: String::from_utf8_lossy(&body).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{RequestPattern, ResponsePattern};
    use std::collections::HashMap;

    fn interaction() -> Interaction {
        Interaction::new("a request for a random joke").upon_receiving(
            RequestPattern::get("/jokes/random").with_header("Accept", "application/json"),
        )
    }

    fn request(uri: &str, accept: Option<&str>) -> RequestData {
        let mut headers = HashMap::new();
        if let Some(accept) = accept {
            headers.insert("accept".to_string(), accept.to_string());
        }

        RequestData {
            uri: uri.into(),
            method: "GET".into(),
            headers,
            body: String::new(),
        }
    }

    #[test]
    fn unreceived_interaction_is_reported_missing() {
        let mut state = MockState::default();
        state.register(interaction());

        let report = state.report();

        assert!(!report.is_success());
        assert!(matches!(
            report.interactions[0].mismatches[0],
            Mismatch::MissingRequest { .. }
        ));
    }

    #[test]
    fn matching_request_is_counted() {
        let mut state = MockState::default();
        state.register(interaction());

        assert!(state
            .match_request(&request("/jokes/random", Some("application/json")))
            .is_some());
        assert!(state.report().is_success());
    }

    #[test]
    fn near_miss_is_recorded_with_reason() {
        let mut state = MockState::default();
        state.register(interaction());

        assert!(state.match_request(&request("/jokes/random", None)).is_none());

        let report = state.report();
        assert!(!report.is_success());
        assert!(report
            .unexpected
            .iter()
            .any(|mismatch| matches!(mismatch, Mismatch::Header { name, .. } if name == "Accept")));
    }

    #[test]
    fn binding_a_taken_port_fails_setup() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        assert!(matches!(MockServer::start(port), Err(Error::SetupFailed(_))));
    }

    #[test]
    fn answers_with_registered_response() {
        let mut server = MockServer::start(0).unwrap();
        server.state().lock().unwrap().register(
            interaction().will_respond_with(
                ResponsePattern::new(200)
                    .with_header("Content-Type", "application/json")
                    .with_body(serde_json::json!({ "id": "abc123" })),
            ),
        );

        let runtime = Runtime::new().unwrap();
        let (status, body) = runtime.block_on(async {
            let request = Request::get(format!("http://127.0.0.1:{}/jokes/random", server.port()))
                .header("Accept", "application/json")
                .body(Body::empty())
                .unwrap();
            let response = hyper::Client::new().request(request).await.unwrap();
            let status = response.status().as_u16();
            let body = body::to_bytes(response.into_body()).await.unwrap();
            (status, String::from_utf8_lossy(&body).to_string())
        });

        drop(runtime);

        assert_eq!(status, 200);
        assert_eq!(body, r#"{"id":"abc123"}"#);
        server.stop();
        assert!(server.state().lock().unwrap().report().is_success());
    }
}
