//! Chunked streaming of agent answers.

use super::runner::Agent;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Split text into pieces of at most `chunk_size` characters.
pub fn split_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Stream `text` in chunks, pausing `delay` between consecutive chunks.
pub fn chunk_response(
    text: &str,
    chunk_size: usize,
    delay: Duration,
) -> BoxStream<'static, String> {
    stream::iter(split_chunks(text, chunk_size).into_iter().enumerate())
        .then(move |(i, chunk)| async move {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            chunk
        })
        .boxed()
}

/// Run the agent on `query` and stream its answer.
///
/// Failures are reported in-band as a single chunk, since the response
/// status has already been sent by the time the agent finishes.
pub fn response_stream(
    agent: Arc<Agent>,
    thread_id: String,
    query: String,
    chunk_size: usize,
    delay: Duration,
) -> BoxStream<'static, String> {
    stream::once(async move {
        match agent.process(&thread_id, &query).await {
            Ok(response) => chunk_response(&response.content, chunk_size, delay),
            Err(e) => {
                error!("Error processing query: {}", e);
                stream::iter(vec![format!("Error processing query: {}", e)]).boxed()
            }
        }
    })
    .flatten()
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runner::tests::{agent_with, text_reply, ScriptedModel};
    use std::time::Instant;

    #[test]
    fn test_split_chunks() {
        assert_eq!(split_chunks("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_chunks("abc", 100), vec!["abc"]);
        assert!(split_chunks("", 10).is_empty());
    }

    #[test]
    fn test_split_chunks_respects_char_boundaries() {
        let chunks = split_chunks("héllo wörld", 2);
        assert_eq!(chunks[0], "hé");
        assert_eq!(chunks.concat(), "héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 2));
    }

    #[test]
    fn test_zero_chunk_size() {
        assert_eq!(split_chunks("ab", 0), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_chunk_response_delays_between_chunks() {
        let start = Instant::now();
        let chunks: Vec<String> = chunk_response("aabbcc", 2, Duration::from_millis(20))
            .collect()
            .await;
        assert_eq!(chunks, vec!["aa", "bb", "cc"]);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_response_stream_answer() {
        let model = Arc::new(ScriptedModel::new(vec![text_reply("pods are running")]));
        let agent = Arc::new(agent_with(model));

        let chunks: Vec<String> = response_stream(
            agent,
            "default".to_string(),
            "status".to_string(),
            5,
            Duration::ZERO,
        )
        .collect()
        .await;
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.concat(), "pods are running");
    }

    #[tokio::test]
    async fn test_response_stream_error() {
        let agent = Arc::new(agent_with(Arc::new(ScriptedModel::new(vec![]))));

        let chunks: Vec<String> = response_stream(
            agent,
            "default".to_string(),
            "status".to_string(),
            5,
            Duration::ZERO,
        )
        .collect()
        .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("Error processing query: OpenAI API error"));
    }
}
