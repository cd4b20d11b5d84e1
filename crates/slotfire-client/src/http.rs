use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use slotfire_core::config::EndpointsConfig;
use slotfire_core::{Catalog, CatalogResponse};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::reservation::{ReservationClient, ReserveRequest, ReserveResponse};

/// [`ReservationClient`] backed by the service's HTTP API.
///
/// The session cookie and user agent are installed as default headers, so
/// every request carries them.
pub struct HttpReservationClient {
    client: reqwest::Client,
    catalog_url: String,
    reserve_url: String,
    reserve_dates: Vec<String>,
}

impl HttpReservationClient {
    pub fn new(endpoints: &EndpointsConfig, cookie: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut cookie_value =
            HeaderValue::from_str(cookie).map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        cookie_value.set_sensitive(true);
        headers.insert(COOKIE, cookie_value);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&endpoints.user_agent)
                .map_err(|e| ClientError::InvalidHeader(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            catalog_url: endpoints.catalog_url.clone(),
            reserve_url: endpoints.reserve_url.clone(),
            reserve_dates: endpoints.reserve_dates.clone(),
        })
    }

    async fn read_body(resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "reservation service HTTP error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ReservationClient for HttpReservationClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn reserve(&self, req: &ReserveRequest) -> Result<ReserveResponse> {
        let target = req.target_id.to_string();
        let form = [
            ("csrf", req.token.as_str()),
            ("inter_reserve_id", target.as_str()),
            ("ticket_no", req.ticket_id.as_str()),
        ];

        debug!(target_id = %req.target_id, ticket_id = %req.ticket_id, "posting reservation");

        let resp = self.client.post(&self.reserve_url).form(&form).send().await?;
        let body = Self::read_body(resp).await?;
        parse_reserve_body(&body)
    }

    async fn fetch_catalog(&self, token: &str) -> Result<Catalog> {
        let dates = self.reserve_dates.join(",");

        debug!(url = %self.catalog_url, dates = %dates, "fetching catalog");

        let resp = self
            .client
            .get(&self.catalog_url)
            .query(&[("csrf", token), ("reserve_date", dates.as_str())])
            .send()
            .await?;
        let body = Self::read_body(resp).await?;
        parse_catalog_body(&body)
    }
}

fn parse_reserve_body(body: &str) -> Result<ReserveResponse> {
    serde_json::from_str(body).map_err(|e| ClientError::Parse(e.to_string()))
}

fn parse_catalog_body(body: &str) -> Result<Catalog> {
    let resp = CatalogResponse::from_json(body).map_err(|e| ClientError::Parse(e.to_string()))?;
    if resp.code != 0 {
        return Err(ClientError::Api {
            code: resp.code,
            message: resp.message,
        });
    }
    Ok(resp.data)
}
