use super::{encode_query, Context, Middleware, Proxy, Request, Response};
use crate::{
  configuration::Backend,
  discovery::{get_subscriber, Subscriber},
  error::Error,
  load_balancing::{random::Random, round_robin::RoundRobin, Balancer},
};
use async_trait::async_trait;
use hyper::http::uri::{PathAndQuery, Uri};
use std::{
  convert::TryFrom,
  sync::Arc,
  time::{SystemTime, UNIX_EPOCH},
};

/// Middleware that sends every request to one host picked by a balancer.
#[derive(Debug, Clone)]
pub struct LoadBalancedMiddleware {
  balancer: Arc<dyn Balancer>,
}

impl LoadBalancedMiddleware {
  pub fn new(balancer: Arc<dyn Balancer>) -> LoadBalancedMiddleware {
    LoadBalancedMiddleware { balancer }
  }

  /// Round robin over the default subscriber of `backend`
  pub fn round_robin(backend: &Backend) -> LoadBalancedMiddleware {
    LoadBalancedMiddleware::round_robin_with_subscriber(get_subscriber(backend))
  }

  /// Random selection over the default subscriber of `backend`
  pub fn random(backend: &Backend) -> LoadBalancedMiddleware {
    LoadBalancedMiddleware::random_with_subscriber(get_subscriber(backend))
  }

  pub fn round_robin_with_subscriber(subscriber: Arc<dyn Subscriber>) -> LoadBalancedMiddleware {
    LoadBalancedMiddleware::new(Arc::new(RoundRobin::new(subscriber)))
  }

  /// Random selection seeded from the wall clock
  pub fn random_with_subscriber(subscriber: Arc<dyn Subscriber>) -> LoadBalancedMiddleware {
    LoadBalancedMiddleware::random_with_seed(subscriber, clock_seed())
  }

  pub fn random_with_seed(subscriber: Arc<dyn Subscriber>, seed: u64) -> LoadBalancedMiddleware {
    LoadBalancedMiddleware::new(Arc::new(Random::new(subscriber, seed)))
  }
}

fn clock_seed() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or_else(|_| elapsed.as_secs()))
    .unwrap_or_default()
}

impl Middleware for LoadBalancedMiddleware {
  fn wrap(&self, next: Option<Arc<dyn Proxy>>) -> Arc<dyn Proxy> {
    Arc::new(LoadBalancedProxy {
      balancer: self.balancer.clone(),
      next,
    })
  }
}

#[derive(Debug)]
struct LoadBalancedProxy {
  balancer: Arc<dyn Balancer>,
  next: Option<Arc<dyn Proxy>>,
}

#[async_trait]
impl Proxy for LoadBalancedProxy {
  async fn call(&self, context: &Context, request: &Request) -> Result<Response, Error> {
    let host = self.balancer.host()?;
    let request = retarget(request, &host)?;

    match &self.next {
      Some(next) => next.call(context, &request).await,
      None => Err(Error::NoDownstreamProxy),
    }
  }
}

/// Clones `request` and points the clone at `host`.
///
/// Host and path are taken verbatim, no dot segment or default port normalization happens.
/// The encoded query is appended to whatever raw query the composed url already carries,
/// without inserting a separator.
fn retarget(request: &Request, host: &str) -> Result<Request, Error> {
  let mut request = request.clone();

  let mut target = String::with_capacity(host.len() + request.path.len());
  target.push_str(host);
  target.push_str(&request.path);
  let mut url = Uri::try_from(target).map_err(|e| Error::InvalidUrl(e.into()))?;

  if !request.query.is_empty() {
    let mut path_and_query = format!("{}?{}", url.path(), url.query().unwrap_or_default());
    path_and_query.push_str(&encode_query(&request.query));

    let mut parts = url.into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).map_err(|e| Error::InvalidUrl(e.into()))?);
    url = Uri::from_parts(parts).map_err(|e| Error::InvalidUrl(e.into()))?;
  }

  request.url = Some(url);
  Ok(request)
}
