use {
    std::{convert::Infallible, io, net::SocketAddr, pin::Pin, sync::Arc},
    tracing::{info, error},
    tokio::net::TcpListener,
    hyper::{Request, Response, StatusCode, body::{Incoming, Bytes}, server::conn::http1},
    hyper_util::rt::{TokioIo, TokioTimer},
    http_body_util::Full,
    serde_json::{Value, json},
    crate::function::CounterFunction,
};

/// Local stand-in for the invocation host: every http request is one invocation.
pub async fn run_http_server(function: Arc<CounterFunction>, port: u16) -> io::Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = TcpListener::bind(addr).await?;
    info!("running counter http server on {addr:?}");
    serve(listener, function).await
}

pub async fn serve(listener: TcpListener, function: Arc<CounterFunction>) -> io::Result<()> {
    let handler = HttpHandler::new(function);

    loop {
        let (tcp, _) = listener.accept().await?;
        let io = TokioIo::new(tcp);
        let handler = handler.clone();
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, handler)
                .await {
                    error!("error while serving http connection: {err:?}");
                }
        });
    }
}

#[derive(Clone)]
pub struct HttpHandler {
    function: Arc<CounterFunction>,
}

impl HttpHandler {
    pub fn new(function: Arc<CounterFunction>) -> Self {
        Self {
            function,
        }
    }
}

impl hyper::service::Service<Request<Incoming>> for HttpHandler {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let function = self.function.clone();
        let event = json!({
            "httpMethod": req.method().as_str(),
            "path": req.uri().path(),
        });

        Box::pin(async move { Ok(invoke(&function, event).await) })
    }
}

async fn invoke(function: &CounterFunction, event: Value) -> Response<Full<Bytes>> {
    let response = match function.handle(event).await {
        Ok(v) => v,
        Err(err) => {
            error!("invocation failed: {err:?}");
            return response_internal_error();
        }
    };

    match response.into_http() {
        Ok(v) => v.map(|body| Full::new(Bytes::from(body))),
        Err(err) => {
            error!("failed to convert function response: {err:?}");
            response_internal_error()
        }
    }
}

fn response_internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"internal server error\n")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
