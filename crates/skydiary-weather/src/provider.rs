//! OpenWeatherMap current-weather client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use skydiary_core::{Clock, NetworkError, ReqwestErrorExt, WeatherConfig};
use tracing::instrument;

use crate::types::{WeatherError, WeatherSnapshot};

/// Anything that can report the current weather for the configured location.
///
/// Implementations do not retry; callers own the retry policy.
pub trait WeatherSource: Send + Sync {
    fn fetch_current(&self) -> impl Future<Output = Result<WeatherSnapshot, WeatherError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainBlock,
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
    icon: String,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    base_url: String,
    city: String,
    api_key: Option<String>,
    clock: Arc<dyn Clock>,
}

impl OpenWeatherProvider {
    /// Build a provider from config. Requests time out after
    /// `config.timeout_secs`.
    pub fn new(config: &WeatherConfig, clock: Arc<dyn Clock>) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::ProviderUnavailable(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            city: config.city.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            clock,
        })
    }

    async fn request(&self) -> Result<CurrentWeatherResponse, NetworkError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NetworkError::MissingCredential("weather.api_key".to_string()))?;
        let url = format!("{}/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", self.city.as_str()), ("appid", api_key)])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<CurrentWeatherResponse>()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))
    }
}

impl WeatherSource for OpenWeatherProvider {
    #[instrument(skip(self), fields(city = %self.city), level = "info")]
    async fn fetch_current(&self) -> Result<WeatherSnapshot, WeatherError> {
        let body = self.request().await.map_err(|e| {
            tracing::warn!("Weather fetch failed: {}", e);
            WeatherError::ProviderUnavailable(e)
        })?;

        let condition = body.weather.into_iter().next().ok_or_else(|| {
            WeatherError::ProviderUnavailable(NetworkError::InvalidResponse(
                "weather array is empty".to_string(),
            ))
        })?;

        let snapshot = WeatherSnapshot::new(
            self.clock.today(),
            condition.main,
            condition.icon,
            body.main.temp,
        );
        tracing::debug!(
            "Fetched weather: {} ({}) {}",
            snapshot.condition,
            snapshot.icon,
            snapshot.temperature
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::NaiveDate;
    use skydiary_core::FixedClock;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 29).unwrap()
    }

    fn provider_for(server: &MockServer, api_key: Option<&str>, timeout_secs: u64) -> OpenWeatherProvider {
        let config = WeatherConfig {
            api_key: api_key.map(str::to_string),
            city: "seoul".to_string(),
            base_url: server.uri(),
            timeout_secs,
        };
        OpenWeatherProvider::new(&config, Arc::new(FixedClock::on(today()))).unwrap()
    }

    fn clear_sky() -> serde_json::Value {
        serde_json::json!({
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 303.91, "humidity": 40},
            "name": "Seoul"
        })
    }

    #[tokio::test]
    async fn test_fetch_current_parses_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "seoul"))
            .and(query_param("appid", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(clear_sky()))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = provider_for(&server, Some("secret"), 5).fetch_current().await.unwrap();

        assert_eq!(snapshot.date, today());
        assert_eq!(snapshot.condition, "Clear");
        assert_eq!(snapshot.icon, "01d");
        assert!((snapshot.temperature - 303.91).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_http_error_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("bad"), 5).fetch_current().await.unwrap_err();

        match err {
            WeatherError::ProviderUnavailable(NetworkError::ServerError { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("Invalid API key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("failed to get response"))
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("secret"), 5).fetch_current().await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::ProviderUnavailable(NetworkError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_weather_array_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "weather": [],
                "main": {"temp": 290.0}
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("secret"), 5).fetch_current().await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::ProviderUnavailable(NetworkError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(clear_sky())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("secret"), 1).fetch_current().await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::ProviderUnavailable(NetworkError::Timeout)
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(clear_sky()))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider_for(&server, None, 5).fetch_current().await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::ProviderUnavailable(NetworkError::MissingCredential(_))
        ));
    }
}
