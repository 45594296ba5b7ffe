//! Interactive chat client for the backend.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use console::style;
use futures::StreamExt;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const TIMEOUT_MESSAGE: &str = "Error: Request timed out. Please try again.";

/// Run the interactive chat command.
pub async fn run_chat(backend: Option<String>, settings: Settings) -> anyhow::Result<()> {
    let backend = backend.unwrap_or_else(|| settings.client.backend_url.clone());
    let client = ChatClient::new(
        &backend,
        Duration::from_secs(settings.client.connect_timeout_secs),
        Duration::from_secs(settings.client.read_timeout_secs),
    )?;

    let mut session = ChatSession::new();

    println!("\n{}", style("Infrastructure Management Chatbot").bold().cyan());
    println!("{}", style(format!("Backend: {}", backend)).dim());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to start a new conversation, 'history' to review it.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            let old = session.reset();
            discard_thread(&client, &old).await;
            Output::info("Conversation history cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("history") {
            session.print_transcript();
            continue;
        }

        session.record("user", input);

        print!("\n{} ", style("Assistant:").cyan().bold());
        stdout.flush()?;

        let reply = client
            .query(&session.thread_id, input, |chunk| {
                print!("{}", chunk);
                io::stdout().flush().ok();
            })
            .await;
        println!("\n");

        session.record("assistant", &reply);
    }

    discard_thread(&client, &session.thread_id).await;
    Ok(())
}

/// Drop a finished conversation from the backend, logging failures.
async fn discard_thread(client: &ChatClient, thread_id: &str) {
    if let Err(e) = client.clear_thread(thread_id).await {
        warn!("Could not clear thread {} on the backend: {}", thread_id, e);
    }
}

/// Local view of one conversation with the backend.
struct ChatSession {
    thread_id: String,
    transcript: Vec<(&'static str, String)>,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            thread_id: new_thread_id(),
            transcript: Vec::new(),
        }
    }

    fn record(&mut self, role: &'static str, content: &str) {
        self.transcript.push((role, content.to_string()));
    }

    /// Start a new thread and return the previous thread id.
    fn reset(&mut self) -> String {
        self.transcript.clear();
        std::mem::replace(&mut self.thread_id, new_thread_id())
    }

    fn print_transcript(&self) {
        if self.transcript.is_empty() {
            Output::info("No messages yet.");
            return;
        }
        for (role, content) in &self.transcript {
            let label = match *role {
                "user" => style("You:").green().bold(),
                _ => style("Assistant:").cyan().bold(),
            };
            println!("{} {}", label, content);
        }
        println!();
    }
}

fn new_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// HTTP client for the backend's query endpoint.
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    read_timeout: Duration,
}

impl ChatClient {
    pub fn new(base_url: &str, connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            read_timeout,
        })
    }

    /// Send a query and stream the answer through `on_chunk`.
    ///
    /// Returns the full reply. Transport failures, non-200 responses and
    /// read timeouts come back as an `Error: ...` reply so the session can
    /// carry on.
    pub async fn query(
        &self,
        thread_id: &str,
        query: &str,
        mut on_chunk: impl FnMut(&str),
    ) -> String {
        let request = self
            .client
            .post(format!("{}/process_query", self.base_url))
            .json(&serde_json::json!({ "query": query, "thread_id": thread_id }))
            .send();

        let response = match tokio::time::timeout(self.read_timeout, request).await {
            Err(_) => return emit(TIMEOUT_MESSAGE.to_string(), &mut on_chunk),
            Ok(Err(e)) if e.is_timeout() => return emit(TIMEOUT_MESSAGE.to_string(), &mut on_chunk),
            Ok(Err(e)) => return emit(format!("Error: {}", e), &mut on_chunk),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return emit(format!("Error: {} - {}", status.as_u16(), body), &mut on_chunk);
        }

        let mut stream = response.bytes_stream();
        let mut decoder = Utf8Decoder::default();
        let mut reply = String::new();

        loop {
            match tokio::time::timeout(self.read_timeout, stream.next()).await {
                Err(_) => {
                    debug!("Read timed out after {} bytes", reply.len());
                    return emit(TIMEOUT_MESSAGE.to_string(), &mut on_chunk);
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => return emit(format!("Error: {}", e), &mut on_chunk),
                Ok(Some(Ok(bytes))) => {
                    let text = decoder.push(&bytes);
                    if !text.is_empty() {
                        on_chunk(&text);
                        reply.push_str(&text);
                    }
                }
            }
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            on_chunk(&rest);
            reply.push_str(&rest);
        }

        reply
    }

    /// Drop a thread's history on the backend. Unknown threads are fine.
    pub async fn clear_thread(&self, thread_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/threads/{}", self.base_url, thread_id))
            .timeout(self.read_timeout)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::NOT_FOUND {
            response.error_for_status()?;
        }
        Ok(())
    }
}

fn emit(message: String, on_chunk: &mut impl FnMut(&str)) -> String {
    on_chunk(&message);
    message
}

/// Incremental UTF-8 decoding for a byte stream that may split characters.
#[derive(Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // Incomplete trailing sequence: hold it back for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        let rest = self.pending.split_off(valid);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, read_timeout: Duration) -> ChatClient {
        ChatClient::new(&server.uri(), Duration::from_secs(5), read_timeout).unwrap()
    }

    #[tokio::test]
    async fn test_query_streams_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process_query"))
            .and(body_json(serde_json::json!({ "query": "list pods", "thread_id": "t1" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("3 pods running"))
            .mount(&server)
            .await;

        let mut seen = String::new();
        let reply = client(&server, Duration::from_secs(5))
            .query("t1", "list pods", |chunk| seen.push_str(chunk))
            .await;
        assert_eq!(reply, "3 pods running");
        assert_eq!(seen, reply);
    }

    #[tokio::test]
    async fn test_query_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process_query"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let reply = client(&server, Duration::from_secs(5))
            .query("t1", "hi", |_| {})
            .await;
        assert_eq!(reply, "Error: 500 - boom");
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process_query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let reply = client(&server, Duration::from_millis(50))
            .query("t1", "hi", |_| {})
            .await;
        assert_eq!(reply, TIMEOUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_clear_thread() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/threads/known"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/threads/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client(&server, Duration::from_secs(5));
        tokio_test::assert_ok!(client.clear_thread("known").await);
        // unmatched requests get 404 from wiremock
        tokio_test::assert_ok!(client.clear_thread("unknown").await);
        tokio_test::assert_err!(client.clear_thread("broken").await);
    }

    #[tokio::test]
    async fn test_discard_thread_deletes_on_backend() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/threads/session-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        discard_thread(&client(&server, Duration::from_secs(5)), "session-1").await;
        // an unreachable backend is only logged
        let offline = ChatClient::new(
            "http://127.0.0.1:9",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        discard_thread(&offline, "session-1").await;
    }

    #[test]
    fn test_utf8_decoder_holds_split_chars() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.push(&bytes[..2]), "h");
        assert_eq!(decoder.push(&bytes[2..]), "éllo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_session_reset() {
        let mut session = ChatSession::new();
        session.record("user", "hi");
        let old = session.thread_id.clone();
        assert_eq!(session.reset(), old);
        assert_ne!(session.thread_id, old);
        assert!(session.transcript.is_empty());
    }
}
