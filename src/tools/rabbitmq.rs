//! RabbitMQ tool backed by the HTTP management API.

use super::Tool;
use crate::config::RabbitMqSettings;
use crate::error::{InfraError, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use url::Url;

const DESCRIPTION: &str = "Manages RabbitMQ servers through the HTTP management API. \
Commands have the form `<METHOD> <path> [json payload]`, for example: \
'GET /api/queues' lists queues, \
'PUT /api/queues/%2F/test_queue {\"durable\":true}' creates a queue, \
'DELETE /api/queues/%2F/test_queue' deletes a queue, \
'GET /api/overview' shows server status, \
'GET /api/health/checks/alarms' checks health. \
The tool returns the API response or explains the failure.";

/// A management API call parsed from a model command.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCommand {
    pub method: Method,
    pub path: String,
    pub payload: Option<String>,
}

impl ApiCommand {
    /// Parse `<METHOD> <path> [payload]`.
    pub fn parse(command: &str) -> Result<Self> {
        let invalid = || InfraError::InvalidInput(format!("Invalid command format: {}", command));

        let (method, rest) = command.trim().split_once(char::is_whitespace).ok_or_else(invalid)?;
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(invalid());
        }

        let method = match method.trim().to_uppercase().as_str() {
            "GET" => Method::GET,
            "PUT" => Method::PUT,
            "POST" => Method::POST,
            "DELETE" => Method::DELETE,
            other => {
                return Err(InfraError::InvalidInput(format!(
                    "Unsupported HTTP method: {}",
                    other
                )))
            }
        };

        let (path, payload) = match rest.split_once(char::is_whitespace) {
            Some((path, payload)) => (path, Some(payload.trim().to_string())),
            None => (rest, None),
        };

        Ok(Self {
            method,
            path: normalize_path(path),
            payload: payload.filter(|p| !p.is_empty()),
        })
    }
}

/// Ensure the path is absolute and rooted at `/api`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed == "api" || trimmed.starts_with("api/") {
        format!("/{}", trimmed)
    } else {
        format!("/api/{}", trimmed)
    }
}

/// RabbitMQ management API tool.
pub struct RabbitMqTool {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl RabbitMqTool {
    /// Create the tool and verify the management API is reachable.
    pub async fn connect(settings: &RabbitMqSettings, timeout: Duration) -> Result<Self> {
        let base = format!("http://{}:{}/", settings.host, settings.management_port);
        let tool = Self::with_base_url(&base, &settings.username, &settings.password, timeout)?;
        tool.test_connection().await?;
        info!("RabbitMQ tool initialization completed successfully");
        Ok(tool)
    }

    /// Create the tool against an explicit base URL without testing it.
    pub fn with_base_url(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| InfraError::Config(format!("Invalid RabbitMQ URL {}: {}", base_url, e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Check server health through `/api/overview`.
    pub async fn test_connection(&self) -> Result<()> {
        let response = self
            .request(Method::GET, "/api/overview", None)
            .await
            .map_err(|e| {
                error!("RabbitMQ connection test failed: {}", e);
                e
            })?;

        let response = response.error_for_status().map_err(|e| {
            error!("RabbitMQ connection test failed: {}", e);
            InfraError::Http(e)
        })?;

        info!("RabbitMQ connection test successful ({})", response.status());
        Ok(())
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| InfraError::InvalidInput(format!("Invalid API path {}: {}", path, e)))
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(method, self.url_for(path)?)
            .basic_auth(&self.username, Some(&self.password));

        if let Some(body) = payload {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        Ok(builder.send().await?)
    }

    async fn run(&self, command: &str) -> Result<String> {
        let api = ApiCommand::parse(command)?;

        // Bodies only make sense for writes.
        let payload = match api.method {
            Method::PUT | Method::POST => api.payload.as_deref(),
            _ => None,
        };

        let response = self.request(api.method.clone(), &api.path, payload).await?;
        describe_response(command, response).await
    }
}

/// Turn a management API response into the tool's reply text.
///
/// A body that cannot be read is an `Http` error, not an empty reply.
async fn describe_response(command: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;

    if status == StatusCode::NOT_FOUND {
        warn!("Resource not found for command: {} (404 error).", command);
        return Ok(format!(
            "Resource not found for the command: {}. Please check if the resource exists.",
            command
        ));
    }

    if status.is_success() {
        let body = text.trim();
        return Ok(if body.is_empty() {
            format!("Command succeeded with status {}", status.as_u16())
        } else {
            body.to_string()
        });
    }

    error!("Error executing RabbitMQ command: {} - {}", status.as_u16(), text);
    Ok(format!(
        "Error executing command: {} - {}",
        status.as_u16(),
        text
    ))
}

#[async_trait]
impl Tool for RabbitMqTool {
    fn name(&self) -> &str {
        "RabbitMQ Tool"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    #[instrument(skip(self), fields(tool = "RabbitMQ Tool"))]
    async fn execute(&self, command: &str) -> Result<String> {
        info!("Command input: {}", command);

        let result = match self.run(command).await {
            Ok(output) => output,
            Err(InfraError::Http(e)) => {
                error!("Request failed: {}", e);
                format!("Request failed: {}", e)
            }
            Err(InfraError::InvalidInput(msg)) => {
                error!("Invalid command format: {}", msg);
                msg
            }
            Err(e) => {
                error!("Unexpected error during command execution: {}", e);
                format!("Unexpected error: {}", e)
            }
        };

        info!("Command output: {}", result);
        Ok(result)
    }
}
