use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::api::PromptRecord;
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::services::PromptSource;
use crate::core::transport::{ByteStream, CompletionTransport};

pub type CapturedRequest = (String, Vec<(String, String)>, Vec<u8>);

pub fn http_response(status_line: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\ncontent-type: {content_type}\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}",
        body.len()
    )
}

pub async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.ok_or_else(|| "header end should exist".to_string())?;
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok((request_line, headers, body))
}

/// Answer each incoming connection with the next canned response.
pub async fn serve_responses(
    responses: Vec<String>,
) -> (String, JoinHandle<Result<Vec<CapturedRequest>, String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");

    let task = tokio::spawn(async move {
        let mut captured = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
            captured.push(read_http_request(&mut stream).await?);
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            stream.shutdown().await.map_err(|err| err.to_string())?;
        }
        Ok(captured)
    });

    (format!("http://{addr}"), task)
}

pub async fn serve_once(
    response: String,
) -> (String, JoinHandle<Result<CapturedRequest, String>>) {
    let (url, task) = serve_responses(vec![response]).await;
    let single = tokio::spawn(async move {
        let mut captured = task.await.map_err(|err| err.to_string())??;
        captured
            .pop()
            .ok_or_else(|| "no request captured".to_string())
    });
    (url, single)
}

pub enum ScriptedReply {
    Chunks(Vec<&'static str>),
    /// Chunks followed by a transport failure mid-stream.
    BrokenAfter(Vec<&'static str>, ChatError),
    Reject(ChatError),
}

/// In-memory transport that replays scripted replies in order and records
/// every history it was asked to send.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    sent: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            sent: Arc::default(),
        }
    }

    pub fn sent(&self) -> Vec<Vec<Message>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn send(&self, history: &[Message]) -> Result<ByteStream, ChatError> {
        self.sent.lock().unwrap().push(history.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedReply::Chunks(Vec::new()));

        let items: Vec<Result<Vec<u8>, ChatError>> = match reply {
            ScriptedReply::Chunks(chunks) => chunks
                .into_iter()
                .map(|chunk| Ok(chunk.as_bytes().to_vec()))
                .collect(),
            ScriptedReply::BrokenAfter(chunks, err) => chunks
                .into_iter()
                .map(|chunk| Ok(chunk.as_bytes().to_vec()))
                .chain(std::iter::once(Err(err)))
                .collect(),
            ScriptedReply::Reject(err) => return Err(err),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Prompt source answering from a fixed result and counting fetches.
#[derive(Clone)]
pub struct StaticPrompts {
    result: Result<Vec<PromptRecord>, ChatError>,
    fetches: Arc<Mutex<usize>>,
}

impl StaticPrompts {
    pub fn new(result: Result<Vec<PromptRecord>, ChatError>) -> Self {
        Self {
            result,
            fetches: Arc::default(),
        }
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl PromptSource for StaticPrompts {
    async fn fetch_prompts(&self) -> Result<Vec<PromptRecord>, ChatError> {
        *self.fetches.lock().unwrap() += 1;
        self.result.clone()
    }
}
