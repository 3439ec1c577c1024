use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use tracing::debug;

use crate::{configuration::Config, error::Error, types::AskEventsResponse};

#[derive(Debug)]
pub struct HTTP {
    pub config: Config,
    pub http: Client,
}

impl HTTP {
    pub fn new(config: Config) -> Result<HTTP, Error> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.reservoir_api_key {
            let mut value = HeaderValue::from_str(api_key)?;
            value.set_sensitive(true);
            headers.insert("x-api-key", value);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .default_headers(headers)
            .build()?;

        Ok(HTTP { config, http })
    }

    pub async fn get_ask_events(
        &self,
        continuation: Option<&str>,
    ) -> Result<AskEventsResponse, Error> {
        let url = self.config.get_ask_events_url(continuation)?;
        debug!("{}", &url);

        let json = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<AskEventsResponse>()
            .await?;

        Ok(json)
    }
}
