use crate::{
  configuration::Endpoint,
  error_response::{bad_request, handle_dispatch_error, not_found},
  proxy::{self, Context},
};
use futures::Future;
use hyper::{
  header::{HeaderValue, HOST},
  server::conn::AddrStream,
  service::{make_service_fn, Service},
  Body, Request, Response, Server,
};
use log::debug;
use std::{
  collections::HashMap,
  io,
  net::SocketAddr,
  pin::Pin,
  sync::Arc,
  task::{self, Poll},
};
use url::form_urlencoded;

pub async fn create(address: SocketAddr, endpoints: Vec<Endpoint>) -> Result<(), io::Error> {
  let endpoints: Arc<HashMap<String, Endpoint>> = Arc::new(
    endpoints
      .into_iter()
      .map(|endpoint| (endpoint.path.clone(), endpoint))
      .collect(),
  );

  let service = make_service_fn(move |stream: &AddrStream| {
    let client_address = stream.remote_addr();
    let endpoints = endpoints.clone();

    async move {
      Ok::<_, io::Error>(MainService {
        client_address,
        endpoints,
      })
    }
  });

  let server = Server::try_bind(&address).map_err(|e| io::Error::new(io::ErrorKind::AddrInUse, e))?;
  server.serve(service).await.map_err(|e| {
    let msg = format!("Failed to listen server: {}", e);
    io::Error::new(io::ErrorKind::Other, msg)
  })
}

pub struct MainService {
  client_address: SocketAddr,
  endpoints: Arc<HashMap<String, Endpoint>>,
}

impl Service<Request<Body>> for MainService {
  type Response = Response<Body>;
  type Error = hyper::Error;

  // let's allow this complex type. A refactor would make it more complicated due to the used trait types
  #[allow(clippy::type_complexity)]
  type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

  fn poll_ready(&mut self, _: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
    Poll::Ready(Ok(()))
  }

  fn call(&mut self, request: Request<Body>) -> Self::Future {
    debug!(
      "{} {:#?} {} {}",
      self.client_address,
      request.version(),
      request.method(),
      request.uri()
    );

    match self.endpoints.get(request.uri().path()).cloned() {
      Some(endpoint) => {
        let client_address = self.client_address;
        Box::pin(async move { Ok(dispatch(&endpoint, &client_address, request).await) })
      }
      None => Box::pin(async { Ok(not_found()) }),
    }
  }
}

async fn dispatch(endpoint: &Endpoint, client_address: &SocketAddr, request: Request<Body>) -> Response<Body> {
  let request = match backend_request(endpoint, client_address, request).await {
    Ok(request) => request,
    Err(e) => return bad_request(format!("unreadable request body: {}", e)),
  };
  let context = match endpoint.timeout {
    Some(timeout) => Context::with_timeout(timeout),
    None => Context::new(),
  };

  match endpoint.proxy.call(&context, &request).await {
    Ok(response) => {
      let mut client_response = Response::new(Body::from(response.body));
      *client_response.status_mut() = response.status;
      *client_response.headers_mut() = response.headers;
      client_response
    }
    Err(e) => handle_dispatch_error(e),
  }
}

/// Translates a client request into the pipeline representation aimed at the backend url pattern.
/// The client's `Host` header is dropped so the backend call carries the selected host instead.
async fn backend_request(
  endpoint: &Endpoint,
  client_address: &SocketAddr,
  request: Request<Body>,
) -> Result<proxy::Request, hyper::Error> {
  let (parts, body) = request.into_parts();

  let mut backend_request = proxy::Request::new(parts.method, endpoint.url_pattern.clone());
  if let Some(query) = parts.uri.query() {
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
      backend_request.add_query(key, value);
    }
  }
  backend_request.headers = parts.headers;
  backend_request.headers.remove(HOST);
  if let Ok(forwarded_for) = HeaderValue::from_str(&client_address.ip().to_string()) {
    backend_request.headers.insert("x-forwarded-for", forwarded_for);
  }
  backend_request.body = hyper::body::to_bytes(body).await?;
  Ok(backend_request)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    error::Error,
    proxy::{Proxy, Response as ProxyResponse},
  };
  use async_trait::async_trait;
  use hyper::{Method, StatusCode};

  #[derive(Debug)]
  struct EchoProxy;

  #[async_trait]
  impl Proxy for EchoProxy {
    async fn call(&self, _context: &Context, request: &proxy::Request) -> Result<ProxyResponse, Error> {
      let body = format!("{} {} {}", request.method, request.path, proxy::encode_query(&request.query));
      Ok(ProxyResponse {
        status: StatusCode::ACCEPTED,
        body: body.into(),
        ..ProxyResponse::default()
      })
    }
  }

  #[derive(Debug)]
  struct EmptyPoolProxy;

  #[async_trait]
  impl Proxy for EmptyPoolProxy {
    async fn call(&self, _context: &Context, _request: &proxy::Request) -> Result<ProxyResponse, Error> {
      Err(Error::NoHosts)
    }
  }

  fn generate_test_service(proxy: Arc<dyn Proxy>) -> MainService {
    let endpoint = Endpoint {
      path: "/users".into(),
      url_pattern: "/api/users".into(),
      timeout: None,
      proxy,
    };
    MainService {
      client_address: "127.0.0.1:3000".parse().unwrap(),
      endpoints: Arc::new(HashMap::from([(endpoint.path.clone(), endpoint)])),
    }
  }

  fn request(uri: &str) -> Request<Body> {
    Request::builder().method(Method::POST).uri(uri).body(Body::empty()).unwrap()
  }

  #[test]
  fn unknown_endpoint_is_not_found() {
    let mut service = generate_test_service(Arc::new(EchoProxy));

    let response = tokio_test::block_on(service.call(request("/orders"))).unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn endpoint_dispatches_to_url_pattern_with_query() {
    let mut service = generate_test_service(Arc::new(EchoProxy));

    let response = tokio_test::block_on(async {
      let response = service.call(request("/users?q=go&page=2")).await.unwrap();
      let status = response.status();
      let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
      (status, body)
    });

    assert_eq!(response.0, StatusCode::ACCEPTED);
    assert_eq!(response.1, "POST /api/users page=2&q=go");
  }

  #[test]
  fn backend_request_forwards_client_address_and_drops_host() {
    let service = generate_test_service(Arc::new(EchoProxy));
    let endpoint = &service.endpoints["/users"];
    let client_request = Request::builder()
      .uri("/users")
      .header(HOST, "gateway.localhost")
      .header("x-trace", "abc")
      .body(Body::empty())
      .unwrap();

    let request = tokio_test::block_on(backend_request(endpoint, &service.client_address, client_request)).unwrap();

    assert_eq!(request.headers["x-forwarded-for"], "127.0.0.1");
    assert_eq!(request.headers["x-trace"], "abc");
    assert!(request.headers.get(HOST).is_none());
    assert_eq!(request.path, "/api/users");
  }

  #[test]
  fn dispatch_error_is_mapped_to_status() {
    let mut service = generate_test_service(Arc::new(EmptyPoolProxy));

    let response = tokio_test::block_on(service.call(request("/users"))).unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
  }
}
