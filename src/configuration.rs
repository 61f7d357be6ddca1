use crate::{
  discovery::STATIC_DISCOVERY,
  error::Error,
  proxy::{balancing::LoadBalancedMiddleware, http::HttpProxy, Middleware, Proxy},
};
use log::{info, warn};
use serde::Deserialize;
use std::{fs, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Config {
  pub listen_address: SocketAddr,
  #[serde(default)]
  pub endpoints: Vec<EndpointConfig>,
}

impl Config {
  pub fn new(toml_path: &str) -> Result<Config, Error> {
    let toml_str = fs::read_to_string(toml_path).map_err(|e| {
      warn!("Error occurred when reading configuration file {}: {}", toml_path, e);
      e
    })?;
    let config: Config = toml_str.parse()?;
    info!("Successfully parsed configuration!");
    config.print_warnings();
    Ok(config)
  }

  fn print_warnings(&self) {
    for endpoint in &self.endpoints {
      if endpoint.backend.hosts.is_empty() && endpoint.backend.sd == STATIC_DISCOVERY {
        warn!(
          "endpoint {} does not contain any hosts. It will always result in bad gateway errors.",
          endpoint.endpoint
        );
      }
    }
  }

  /// Assembles one dispatch pipeline per endpoint.
  pub fn build_pipelines(&self) -> Result<Vec<Endpoint>, Error> {
    let mut endpoints = Vec::with_capacity(self.endpoints.len());
    for config in &self.endpoints {
      if endpoints.iter().any(|e: &Endpoint| e.path == config.endpoint) {
        return Err(Error::InvalidConfig(format!("duplicate endpoint {}", config.endpoint)));
      }
      let middleware = config.backend.middleware();
      let terminal: Arc<dyn Proxy> = Arc::new(HttpProxy::default());
      endpoints.push(Endpoint {
        path: config.endpoint.clone(),
        url_pattern: config.backend.url_pattern.clone(),
        timeout: config.timeout.map(Duration::from_millis),
        proxy: middleware.chain(vec![terminal])?,
      });
    }
    Ok(endpoints)
  }
}

impl FromStr for Config {
  type Err = Error;

  fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
    Ok(toml::from_str(toml_str)?)
  }
}

#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
  pub endpoint: String,
  /// milliseconds
  pub timeout: Option<u64>,
  pub backend: Backend,
}

/// Descriptor of the backend an endpoint dispatches to.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Backend {
  pub url_pattern: String,
  #[serde(default)]
  pub hosts: Vec<String>,
  #[serde(default = "default_discovery")]
  pub sd: String,
  #[serde(default)]
  pub load_balancer: LoadBalancerConfig,
}

impl Default for Backend {
  fn default() -> Self {
    Backend {
      url_pattern: String::new(),
      hosts: Vec::new(),
      sd: default_discovery(),
      load_balancer: LoadBalancerConfig::default(),
    }
  }
}

impl Backend {
  pub fn middleware(&self) -> LoadBalancedMiddleware {
    match self.load_balancer {
      LoadBalancerConfig::RoundRobin => LoadBalancedMiddleware::round_robin(self),
      LoadBalancerConfig::Random => LoadBalancedMiddleware::random(self),
    }
  }
}

fn default_discovery() -> String {
  STATIC_DISCOVERY.into()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub enum LoadBalancerConfig {
  RoundRobin,
  Random,
}

impl Default for LoadBalancerConfig {
  fn default() -> Self {
    LoadBalancerConfig::RoundRobin
  }
}

/// A routable path with its ready-to-use pipeline.
#[derive(Debug, Clone)]
pub struct Endpoint {
  pub path: String,
  pub url_pattern: String,
  pub timeout: Option<Duration>,
  pub proxy: Arc<dyn Proxy>,
}
