use super::{current_hosts, Balancer};
use crate::{discovery::Subscriber, error::Error};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

#[derive(Debug)]
pub struct RoundRobin {
  subscriber: Arc<dyn Subscriber>,
  counter: AtomicUsize,
}

impl RoundRobin {
  pub fn new(subscriber: Arc<dyn Subscriber>) -> RoundRobin {
    RoundRobin {
      subscriber,
      counter: AtomicUsize::new(0),
    }
  }
}

impl Balancer for RoundRobin {
  fn host(&self) -> Result<String, Error> {
    let mut hosts = current_hosts(&self.subscriber)?;
    let offset = self.counter.fetch_add(1, Ordering::Relaxed);
    Ok(hosts.swap_remove(offset % hosts.len()))
  }
}
