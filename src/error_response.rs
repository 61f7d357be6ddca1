use crate::error::Error;
use hyper::{Body, Response, StatusCode};
use log::error;

pub fn not_found() -> Response<Body> {
  status_response(StatusCode::NOT_FOUND, Body::from("404 - page not found"))
}

pub fn bad_gateway() -> Response<Body> {
  status_response(StatusCode::BAD_GATEWAY, Body::empty())
}

pub fn gateway_timeout() -> Response<Body> {
  status_response(StatusCode::GATEWAY_TIMEOUT, Body::empty())
}

pub fn internal_server_error() -> Response<Body> {
  status_response(StatusCode::INTERNAL_SERVER_ERROR, Body::empty())
}

pub fn bad_request<B>(message: B) -> Response<Body>
where
  Body: From<B>,
{
  status_response(StatusCode::BAD_REQUEST, Body::from(message))
}

/// Logs a failed dispatch and turns it into the response sent to the client.
pub fn handle_dispatch_error(error: Error) -> Response<Body> {
  error!("{}", error);
  match error {
    Error::NoHosts | Error::Subscriber(_) | Error::Transport(_) | Error::Downstream(_) => bad_gateway(),
    Error::Cancelled | Error::DeadlineExceeded => gateway_timeout(),
    _ => internal_server_error(),
  }
}

fn status_response(status: StatusCode, body: Body) -> Response<Body> {
  let mut response = Response::new(body);
  *response.status_mut() = status;
  response
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selection_failure_is_bad_gateway() {
    assert_eq!(handle_dispatch_error(Error::NoHosts).status(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn deadline_is_gateway_timeout() {
    assert_eq!(
      handle_dispatch_error(Error::DeadlineExceeded).status(),
      StatusCode::GATEWAY_TIMEOUT
    );
  }

  #[test]
  fn composition_failure_is_internal_server_error() {
    let error = Error::InvalidUrl("http://[::1".parse::<hyper::Uri>().unwrap_err().into());

    assert_eq!(handle_dispatch_error(error).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
