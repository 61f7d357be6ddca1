use super::{Context, Proxy, Request, Response};
use crate::error::Error;
use async_trait::async_trait;
use hyper::{client::HttpConnector, Body, Client};

/// Terminal stage: performs the call against the url a previous stage selected.
#[derive(Debug, Clone)]
pub struct HttpProxy {
  client: Client<HttpConnector, Body>,
}

impl Default for HttpProxy {
  fn default() -> Self {
    HttpProxy::new(Client::new())
  }
}

impl HttpProxy {
  pub fn new(client: Client<HttpConnector, Body>) -> HttpProxy {
    HttpProxy { client }
  }

  async fn round_trip(&self, request: &Request) -> Result<Response, Error> {
    let backend_request = backend_request(request)?;
    let response = self.client.request(backend_request).await?;

    let (parts, body) = response.into_parts();
    let body = hyper::body::to_bytes(body).await?;
    Ok(Response {
      status: parts.status,
      headers: parts.headers,
      body,
      is_complete: true,
    })
  }
}

fn backend_request(request: &Request) -> Result<hyper::Request<Body>, Error> {
  let uri = request.url.clone().ok_or(Error::MissingUrl)?;

  let builder = hyper::Request::builder().method(request.method.clone()).uri(uri);
  let backend_request = request
    .headers
    .iter()
    .fold(builder, |builder, (key, val)| builder.header(key, val))
    .body(Body::from(request.body.clone()))?;
  Ok(backend_request)
}

#[async_trait]
impl Proxy for HttpProxy {
  async fn call(&self, context: &Context, request: &Request) -> Result<Response, Error> {
    if context.is_cancelled() {
      return Err(context.done().await);
    }
    tokio::select! {
      error = context.done() => Err(error),
      result = self.round_trip(request) => result,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use hyper::{
    header::HeaderValue,
    service::{make_service_fn, service_fn},
    Method, Server, StatusCode,
  };
  use std::{convert::Infallible, net::SocketAddr};

  fn request_to(url: &str) -> Request {
    Request {
      url: Some(url.parse().unwrap()),
      ..Request::new(Method::GET, "")
    }
  }

  async fn spawn_backend() -> SocketAddr {
    let service = make_service_fn(|_| async {
      Ok::<_, Infallible>(service_fn(|request: hyper::Request<Body>| async move {
        let body = format!("{} {}", request.method(), request.uri());
        Ok::<_, Infallible>(
          hyper::Response::builder()
            .status(StatusCode::CREATED)
            .header("x-backend", "stub")
            .body(Body::from(body))
            .unwrap(),
        )
      }))
    });
    let server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(service);
    let address = server.local_addr();
    tokio::spawn(server);
    address
  }

  #[test]
  fn backend_request_copies_method_headers_and_body() {
    let mut request = request_to("http://127.0.0.1:1/users?q=go");
    request.method = Method::PUT;
    request.headers.insert("x-trace", HeaderValue::from_static("abc"));
    request.body = "payload".into();

    let backend_request = backend_request(&request).unwrap();

    assert_eq!(backend_request.method(), Method::PUT);
    assert_eq!(backend_request.uri(), "http://127.0.0.1:1/users?q=go");
    assert_eq!(backend_request.headers()["x-trace"], "abc");
  }

  #[test]
  fn missing_url_is_rejected() {
    let result = tokio_test::block_on(HttpProxy::default().call(&Context::new(), &Request::new(Method::GET, "/")));

    assert!(matches!(result, Err(Error::MissingUrl)));
  }

  #[test]
  fn cancelled_context_stops_the_call() {
    let context = Context::new();
    context.cancel();

    let result = tokio_test::block_on(HttpProxy::default().call(&context, &request_to("http://127.0.0.1:1/")));

    assert!(matches!(result, Err(Error::Cancelled)));
  }

  #[test]
  fn response_is_collected_from_backend() {
    let response = tokio_test::block_on(async {
      let address = spawn_backend().await;
      let request = request_to(&format!("http://{}/users?q=go", address));
      HttpProxy::default().call(&Context::new(), &request).await
    })
    .unwrap();

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.headers["x-backend"], "stub");
    assert_eq!(response.body, "GET /users?q=go");
    assert!(response.is_complete);
  }
}
