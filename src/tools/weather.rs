//! Weather 工具：通过 wttr.in 查询城市实时天气
//!
//! GET `{base_url}/{city}?format=j1`（city 作为单个路径段编码），带超时与 User-Agent；
//! 从 current_condition 中取天气描述与摄氏温度，失败时返回可读错误（由执行器写入 Observation）。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::tools::{Tool, ToolInput};

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://wttr.in";

/// Weather 工具：输入城市名，返回「城市当前天气：描述，气温 N 摄氏度」
pub struct WeatherTool {
    client: Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("hello-agents/0.1")
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request_url(&self, city: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid weather base url {}: {e}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| format!("weather base url cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .push(city);
        url.set_query(Some("format=j1"));
        Ok(url)
    }

    async fn fetch(&self, city: &str) -> Result<String, String> {
        let url = self.request_url(city)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("weather request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("weather service returned HTTP {}", resp.status()));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| format!("weather response is not JSON: {e}"))?;
        summarize(city, &data)
    }
}

/// 从 wttr.in j1 格式中提取天气描述与温度
fn summarize(city: &str, data: &Value) -> Result<String, String> {
    let current = data
        .get("current_condition")
        .and_then(|c| c.get(0))
        .ok_or_else(|| "weather response has no current_condition".to_string())?;
    let desc = current
        .get("weatherDesc")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("value"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let temp = current
        .get("temp_C")
        .and_then(Value::as_str)
        .unwrap_or("?");
    Ok(format!("{city} current weather: {desc}, {temp} °C"))
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Look up the current weather of a city. Usage: get_weather(city=\"Beijing\")"
    }

    async fn execute(&self, input: ToolInput) -> Result<String, String> {
        let city = input
            .get("city")
            .map(str::to_string)
            .unwrap_or_else(|| input.as_text());
        let city = city.trim();
        if city.is_empty() {
            return Err("missing city".to_string());
        }
        tracing::info!(city = %city, "weather tool fetch");
        self.fetch(city).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_current_condition() {
        let data = serde_json::json!({
            "current_condition": [{
                "temp_C": "27",
                "weatherDesc": [{"value": "Partly cloudy"}]
            }]
        });
        assert_eq!(
            summarize("Shenzhen", &data).unwrap(),
            "Shenzhen current weather: Partly cloudy, 27 °C"
        );
    }

    #[test]
    fn test_summarize_missing_condition() {
        let err = summarize("Nowhere", &serde_json::json!({})).unwrap_err();
        assert!(err.contains("current_condition"));
    }

    #[test]
    fn test_city_is_encoded_as_one_path_segment() {
        let tool = WeatherTool::new("https://wttr.in/", 1);
        let url = tool.request_url("a/b?c#d").unwrap();
        assert_eq!(url.as_str(), "https://wttr.in/a%2Fb%3Fc%23d?format=j1");
        assert_eq!(
            tool.request_url("New York").unwrap().as_str(),
            "https://wttr.in/New%20York?format=j1"
        );
    }

    #[test]
    fn test_base_url_path_is_kept() {
        let tool = WeatherTool::new("http://127.0.0.1:8080/weather", 1);
        assert_eq!(
            tool.request_url("Beijing").unwrap().as_str(),
            "http://127.0.0.1:8080/weather/Beijing?format=j1"
        );
    }

    #[tokio::test]
    async fn test_missing_city_is_error() {
        let tool = WeatherTool::new(DEFAULT_WEATHER_BASE_URL, 1);
        let err = tool.execute(ToolInput::Text("   ".into())).await.unwrap_err();
        assert_eq!(err, "missing city");
    }
}
