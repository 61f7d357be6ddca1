use crate::error::Error;
use async_trait::async_trait;
use hyper::{body::Bytes, HeaderMap, Method, StatusCode, Uri};
use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
  time::Duration,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

pub mod balancing;
pub mod http;

/// Multi-valued query parameters, kept sorted by key.
pub type Query = BTreeMap<String, Vec<String>>;

/// Form-urlencodes a query collection, keys in sorted order and values in insertion order.
pub fn encode_query(query: &Query) -> String {
  let mut serializer = form_urlencoded::Serializer::new(String::new());
  for (key, values) in query {
    for value in values {
      serializer.append_pair(key, value);
    }
  }
  serializer.finish()
}

/// Cancellation and deadline of a single call through the pipeline.
///
/// Clones share the same cancellation token, children are cancelled together with their parent.
#[derive(Debug, Clone)]
pub struct Context {
  token: CancellationToken,
  deadline: Option<Instant>,
}

impl Default for Context {
  fn default() -> Self {
    Context::new()
  }
}

impl Context {
  pub fn new() -> Context {
    Context {
      token: CancellationToken::new(),
      deadline: None,
    }
  }

  pub fn with_timeout(timeout: Duration) -> Context {
    Context {
      token: CancellationToken::new(),
      deadline: Some(Instant::now() + timeout),
    }
  }

  pub fn child(&self) -> Context {
    Context {
      token: self.token.child_token(),
      deadline: self.deadline,
    }
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  pub fn cancel(&self) {
    self.token.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.token.is_cancelled() || self.deadline.map_or(false, |deadline| deadline <= Instant::now())
  }

  /// Resolves once the context is cancelled or its deadline passed, yielding the matching error.
  pub async fn done(&self) -> Error {
    match self.deadline {
      Some(deadline) => tokio::select! {
        _ = self.token.cancelled() => Error::Cancelled,
        _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
      },
      None => {
        self.token.cancelled().await;
        Error::Cancelled
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  pub method: Method,
  pub url: Option<Uri>,
  pub path: String,
  pub query: Query,
  pub params: HashMap<String, String>,
  pub headers: HeaderMap,
  pub body: Bytes,
}

impl Default for Request {
  fn default() -> Self {
    Request {
      method: Method::GET,
      url: None,
      path: String::new(),
      query: Query::new(),
      params: HashMap::new(),
      headers: HeaderMap::new(),
      body: Bytes::new(),
    }
  }
}

impl Request {
  pub fn new(method: Method, path: impl Into<String>) -> Request {
    Request {
      method,
      path: path.into(),
      ..Request::default()
    }
  }

  pub fn add_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.query.entry(key.into()).or_default().push(value.into());
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Bytes,
  pub is_complete: bool,
}

impl Default for Response {
  fn default() -> Self {
    Response {
      status: StatusCode::OK,
      headers: HeaderMap::new(),
      body: Bytes::new(),
      is_complete: true,
    }
  }
}

/// A single stage of the dispatch pipeline.
#[async_trait]
pub trait Proxy: Send + Sync + std::fmt::Debug {
  async fn call(&self, context: &Context, request: &Request) -> Result<Response, Error>;
}

/// Turns the next stage of the pipeline into a new stage.
pub trait Middleware: Send + Sync + std::fmt::Debug {
  /// Builds a stage over an optional next stage.
  fn wrap(&self, next: Option<Arc<dyn Proxy>>) -> Arc<dyn Proxy>;

  /// Builds a stage over a list of next stages, which must hold at most one entry.
  /// More than one entry is a wiring mistake and is rejected before any request is handled.
  fn chain(&self, next: Vec<Arc<dyn Proxy>>) -> Result<Arc<dyn Proxy>, Error> {
    if next.len() > 1 {
      return Err(Error::TooManyProxies(next.len()));
    }
    Ok(self.wrap(next.into_iter().next()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encode_query_sorts_keys_and_keeps_value_order() {
    let mut query = Query::new();
    query.insert("q".into(), vec!["go".into()]);
    query.insert("b".into(), vec!["2".into(), "1".into()]);

    assert_eq!(encode_query(&query), "b=2&b=1&q=go");
  }

  #[test]
  fn encode_query_escapes_reserved_characters() {
    let mut request = Request::new(Method::GET, "/search");
    request.add_query("q", "rust lang&more");

    assert_eq!(encode_query(&request.query), "q=rust+lang%26more");
  }

  #[test]
  fn cloned_request_owns_its_query() {
    let mut original = Request::new(Method::GET, "/search");
    original.add_query("q", "go");

    let mut clone = original.clone();
    clone.add_query("page", "2");
    clone.url = Some(Uri::from_static("http://x:9000/search"));

    assert_eq!(original.query.len(), 1);
    assert_eq!(original.url, None);
  }

  #[test]
  fn child_context_observes_parent_cancellation() {
    let parent = Context::new();
    let child = parent.child();

    parent.cancel();

    assert!(child.is_cancelled());
  }

  #[test]
  fn parent_context_ignores_child_cancellation() {
    let parent = Context::new();
    let child = parent.child();

    child.cancel();

    assert!(!parent.is_cancelled());
  }

  #[test]
  fn done_reports_deadline() {
    tokio_test::block_on(async {
      let context = Context::with_timeout(Duration::from_millis(5));

      assert!(matches!(context.done().await, Error::DeadlineExceeded));
    });
  }

  #[test]
  fn done_reports_cancellation() {
    tokio_test::block_on(async {
      let context = Context::new();
      context.cancel();

      assert!(matches!(context.done().await, Error::Cancelled));
    });
  }
}
