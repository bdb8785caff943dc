use std::time::Duration;

use log::debug;
use reqwest::{header::ACCEPT, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Canvas, CanvasError, CanvasResult, CanvasSize};
use crate::models::point::Point;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCanvasConfig {
    pub base_url: String,
    pub size_endpoint: String,
    pub rate_endpoint: String,
    pub pixel_endpoint: String,
    pub request_timeout: Duration,
}

impl HttpCanvasConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            size_endpoint: "/canvas/size".to_string(),
            rate_endpoint: "/canvas/pps".to_string(),
            pixel_endpoint: "/canvas/pixel".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpCanvas {
    client: Client,
    config: HttpCanvasConfig,
}

impl HttpCanvas {
    pub fn new(config: HttpCanvasConfig) -> CanvasResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("pixel-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn get_json(&self, endpoint: &str) -> CanvasResult<Value> {
        let url = self.url(endpoint);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Ok(check_status(&url, response)?.json().await?)
    }
}

fn check_status(url: &str, response: Response) -> CanvasResult<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(CanvasError::Status {
            endpoint: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// The rate endpoint answers either a bare number or a numeric string.
fn parse_rate(endpoint: &str, value: &Value) -> CanvasResult<f64> {
    let rate = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    rate.filter(|pps| pps.is_finite() && *pps > 0.0)
        .ok_or_else(|| CanvasError::InvalidValue {
            endpoint: endpoint.to_string(),
            value: value.to_string(),
        })
}

impl Canvas for HttpCanvas {
    async fn get_canvas_size(&self) -> CanvasResult<CanvasSize> {
        let value = self.get_json(&self.config.size_endpoint).await?;
        serde_json::from_value(value.clone()).map_err(|_| CanvasError::InvalidValue {
            endpoint: self.config.size_endpoint.clone(),
            value: value.to_string(),
        })
    }

    async fn get_rate_limit(&self) -> CanvasResult<f64> {
        let value = self.get_json(&self.config.rate_endpoint).await?;
        let pps = parse_rate(&self.config.rate_endpoint, &value)?;
        debug!("Canvas rate limit: {} points/s", pps);
        Ok(pps)
    }

    async fn put_pixel(&self, point: Point) -> CanvasResult<()> {
        let url = self.url(&self.config.pixel_endpoint);
        let response = self
            .client
            .put(&url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("x", point.x.to_string()),
                ("y", point.y.to_string()),
                ("color", point.color.to_hex()),
            ])
            .send()
            .await?;
        check_status(&url, response).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_endpoint() {
        let canvas = HttpCanvas::new(HttpCanvasConfig::new("http://canvas:8000/".into())).unwrap();
        assert_eq!(canvas.url("/canvas/pps"), "http://canvas:8000/canvas/pps");
    }

    #[test]
    fn accepts_numeric_and_string_rates() {
        assert_eq!(parse_rate("/pps", &Value::from(12.5)).unwrap(), 12.5);
        assert_eq!(parse_rate("/pps", &Value::from(" 4 ")).unwrap(), 4.0);
        assert!(parse_rate("/pps", &Value::from(0)).is_err());
        assert!(parse_rate("/pps", &Value::from("fast")).is_err());
        assert!(parse_rate("/pps", &Value::Null).is_err());
    }
}
