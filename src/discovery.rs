use crate::{configuration::Backend, error::Error};
use arc_swap::ArcSwap;
use log::debug;
use std::{
  collections::HashMap,
  sync::{Arc, OnceLock, PoisonError, RwLock},
};

/// Name under which the fixed subscriber is registered.
pub const STATIC_DISCOVERY: &str = "static";

/// Source of the current set of candidate hosts.
pub trait Subscriber: Send + Sync + std::fmt::Debug {
  fn hosts(&self) -> Result<Vec<String>, Error>;
}

/// A subscriber over a host list that never changes
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSubscriber {
  hosts: Vec<String>,
}

impl FixedSubscriber {
  pub fn new(hosts: Vec<String>) -> FixedSubscriber {
    FixedSubscriber { hosts }
  }
}

impl Subscriber for FixedSubscriber {
  fn hosts(&self) -> Result<Vec<String>, Error> {
    Ok(self.hosts.clone())
  }
}

/// A subscriber whose host list can be replaced while requests are in flight.
/// Readers never block writers; a balancer sees either the old or the new list.
#[derive(Debug)]
pub struct SwappableSubscriber {
  hosts: ArcSwap<Vec<String>>,
}

impl SwappableSubscriber {
  pub fn new(hosts: Vec<String>) -> SwappableSubscriber {
    SwappableSubscriber {
      hosts: ArcSwap::from_pointee(hosts),
    }
  }

  pub fn update(&self, hosts: Vec<String>) {
    debug!("replacing subscriber hosts with {:?}", hosts);
    self.hosts.store(Arc::new(hosts));
  }
}

impl Subscriber for SwappableSubscriber {
  fn hosts(&self) -> Result<Vec<String>, Error> {
    Ok(self.hosts.load().as_ref().clone())
  }
}

pub type SubscriberFactory = fn(&Backend) -> Arc<dyn Subscriber>;

fn fixed_subscriber_factory(backend: &Backend) -> Arc<dyn Subscriber> {
  Arc::new(FixedSubscriber::new(backend.hosts.clone()))
}

fn register() -> &'static RwLock<HashMap<String, SubscriberFactory>> {
  static REGISTER: OnceLock<RwLock<HashMap<String, SubscriberFactory>>> = OnceLock::new();
  REGISTER.get_or_init(|| {
    let mut factories: HashMap<String, SubscriberFactory> = HashMap::new();
    factories.insert(STATIC_DISCOVERY.into(), fixed_subscriber_factory);
    RwLock::new(factories)
  })
}

/// Makes a discovery mechanism available under `name` for backends whose `sd` field names it.
pub fn register_subscriber_factory(name: &str, factory: SubscriberFactory) {
  let mut factories = register().write().unwrap_or_else(PoisonError::into_inner);
  factories.insert(name.to_string(), factory);
}

/// Resolves the default subscriber of a backend descriptor.
/// Unknown discovery names fall back to the fixed subscriber over the configured hosts.
pub fn get_subscriber(backend: &Backend) -> Arc<dyn Subscriber> {
  let factories = register().read().unwrap_or_else(PoisonError::into_inner);
  match factories.get(backend.sd.as_str()) {
    Some(factory) => factory(backend),
    None => {
      debug!(
        "no subscriber registered for `{}`, falling back to {}",
        backend.sd, STATIC_DISCOVERY
      );
      fixed_subscriber_factory(backend)
    }
  }
}
