use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
  NoHosts,
  Subscriber(String),
  InvalidUrl(hyper::http::Error),
  TooManyProxies(usize),
  NoDownstreamProxy,
  MissingUrl,
  InvalidRequest(hyper::http::Error),
  Transport(hyper::Error),
  Cancelled,
  DeadlineExceeded,
  Downstream(Box<dyn error::Error + Send + Sync>),
  Io(io::Error),
  Toml(toml::de::Error),
  InvalidConfig(String),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Error::NoHosts => write!(f, "no hosts available"),
      Error::Subscriber(reason) => write!(f, "subscriber failed: {}", reason),
      Error::InvalidUrl(e) => write!(f, "invalid backend url: {}", e),
      Error::TooManyProxies(count) => write!(
        f,
        "too many proxies for a load balanced middleware: expected at most 1, got {}",
        count
      ),
      Error::NoDownstreamProxy => write!(f, "no downstream proxy configured"),
      Error::MissingUrl => write!(f, "request has no target url"),
      Error::InvalidRequest(e) => write!(f, "invalid backend request: {}", e),
      Error::Transport(e) => write!(f, "backend call failed: {}", e),
      Error::Cancelled => write!(f, "context cancelled"),
      Error::DeadlineExceeded => write!(f, "context deadline exceeded"),
      Error::Downstream(e) => write!(f, "{}", e),
      Error::Io(e) => write!(f, "{}", e),
      Error::Toml(e) => write!(f, "invalid configuration: {}", e),
      Error::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
    }
  }
}

impl error::Error for Error {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      Error::InvalidUrl(e) => Some(e),
      Error::InvalidRequest(e) => Some(e),
      Error::Transport(e) => Some(e),
      Error::Downstream(e) => Some(e.as_ref()),
      Error::Io(e) => Some(e),
      Error::Toml(e) => Some(e),
      _ => None,
    }
  }
}

impl From<hyper::Error> for Error {
  fn from(other: hyper::Error) -> Self {
    Error::Transport(other)
  }
}

impl From<hyper::http::Error> for Error {
  fn from(other: hyper::http::Error) -> Self {
    Error::InvalidRequest(other)
  }
}

impl From<io::Error> for Error {
  fn from(other: io::Error) -> Self {
    Error::Io(other)
  }
}

impl From<toml::de::Error> for Error {
  fn from(other: toml::de::Error) -> Self {
    Error::Toml(other)
  }
}
