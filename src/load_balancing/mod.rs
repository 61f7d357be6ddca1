use crate::{discovery::Subscriber, error::Error};
use std::sync::Arc;

pub mod random;
pub mod round_robin;

/// Selects one host per call from the pool of a subscriber.
///
/// Implementations own their selection state and synchronize it themselves,
/// callers may invoke `host` concurrently without any locking of their own.
pub trait Balancer: Send + Sync + std::fmt::Debug {
  fn host(&self) -> Result<String, Error>;
}

/// Fetches the current pool, failing with `Error::NoHosts` if it is empty.
fn current_hosts(subscriber: &Arc<dyn Subscriber>) -> Result<Vec<String>, Error> {
  let hosts = subscriber.hosts()?;
  if hosts.is_empty() {
    Err(Error::NoHosts)
  } else {
    Ok(hosts)
  }
}
