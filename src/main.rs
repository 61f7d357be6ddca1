use balanced_dispatch::{configuration::Config, logging, server};
use clap::{Arg, Command};
use log::info;
use std::error::Error;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn Error>> {
  let matches = Command::new("balanced-dispatch")
    .about("Gateway dispatching every endpoint to one load balanced backend host")
    .arg(
      Arg::new("config")
        .short('c')
        .long("config")
        .takes_value(true)
        .default_value("config.toml")
        .help("Path to the TOML configuration"),
    )
    .get_matches();

  let _handle = logging::initialize()?;

  let config_path = matches.value_of("config").unwrap_or("config.toml");
  let config = Config::new(config_path)?;
  // wiring mistakes abort start-up here, before the listener is bound
  let endpoints = config.build_pipelines()?;

  info!(
    "Serving {} endpoint(s) on {}",
    endpoints.len(),
    config.listen_address
  );
  server::create(config.listen_address, endpoints).await?;
  Ok(())
}
