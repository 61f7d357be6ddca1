use super::{current_hosts, Balancer};
use crate::{discovery::Subscriber, error::Error};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub struct Random {
  subscriber: Arc<dyn Subscriber>,
  rng: Mutex<StdRng>,
}

impl Random {
  pub fn new(subscriber: Arc<dyn Subscriber>, seed: u64) -> Random {
    Random {
      subscriber,
      rng: Mutex::new(StdRng::seed_from_u64(seed)),
    }
  }
}

impl Balancer for Random {
  fn host(&self) -> Result<String, Error> {
    let mut hosts = current_hosts(&self.subscriber)?;
    // poisoning is harmless, the generator holds no cross-field invariant
    let index = self
      .rng
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .gen_range(0..hosts.len());
    Ok(hosts.swap_remove(index))
  }
}
