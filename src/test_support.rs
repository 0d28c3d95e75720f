use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use hyper::{
    service::{make_service_fn, service_fn},
    Body, HeaderMap, Request, Response, Server, StatusCode,
};

/// Requests received by a mock metadata server, (path, headers)
///
pub(crate) type Recorded = Arc<Mutex<Vec<(String, HeaderMap)>>>;

/// Starts a local server that answers every request w/ status and body,
///
pub(crate) fn serve(status: StatusCode, body: &'static str) -> (SocketAddr, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(vec![]));
    let seen = recorded.clone();

    let make_svc = make_service_fn(move |_| {
        let seen = seen.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                seen.lock()
                    .expect("should be able to lock")
                    .push((req.uri().path().to_string(), req.headers().clone()));

                async move { Response::builder().status(status).body(Body::from(body)) }
            }))
        }
    });

    let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
    let addr = server.local_addr();
    tokio::spawn(server);

    (addr, recorded)
}

/// Starts a local listener that accepts connections but never responds,
///
pub(crate) async fn serve_hung() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should be able to bind");
    let addr = listener.local_addr().expect("should have an address");

    tokio::spawn(async move {
        let mut open = vec![];
        while let Ok((stream, _)) = listener.accept().await {
            open.push(stream);
        }
    });

    addr
}
