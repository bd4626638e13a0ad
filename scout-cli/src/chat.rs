use std::io::Write;
use std::pin::pin;

use anyhow::{anyhow, Context};
use console::style;
use futures::future;
use futures::stream::{Stream, StreamExt};
use reqwest_eventsource::{Event, EventSource};
use scout_core::relay::NEW_THREAD_SENTINEL;
use scout_core::WireEvent;
use scout_http::apis::chat::ChatRequest;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Links shown under an answer
pub const MAX_DISPLAYED_LINKS: usize = 4;

/// Client-side view of one conversation
#[derive(Debug, Default)]
pub struct Conversation {
    thread_id: Option<String>,
}

impl Conversation {
    pub fn new(thread_id: Option<String>) -> Self {
        Self { thread_id }
    }

    /// Id to send with the next request
    pub fn request_thread_id(&self) -> &str {
        self.thread_id.as_deref().unwrap_or(NEW_THREAD_SENTINEL)
    }

    pub fn reset(&mut self) {
        self.thread_id = None;
    }

    /// Adopt the outcome of a finished turn
    pub fn absorb(&mut self, turn: &Turn) {
        if let Some(id) = &turn.announced_thread {
            self.thread_id = Some(id.clone());
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Everything received for one request
#[derive(Debug, Default)]
pub struct Turn {
    pub reply: String,
    pub urls: Vec<String>,
    pub announced_thread: Option<String>,
    pub error: Option<String>,
    pub finished: bool,
}

impl Turn {
    pub fn apply(&mut self, event: WireEvent) -> Flow {
        match event {
            WireEvent::Session { thread_id } => {
                self.announced_thread = Some(thread_id);
                Flow::Continue
            }
            WireEvent::Token { text } => {
                self.reply.push_str(&text);
                Flow::Continue
            }
            WireEvent::SearchStart { .. } => Flow::Continue,
            WireEvent::SearchResults { urls, .. } => {
                self.urls.extend(urls);
                Flow::Continue
            }
            WireEvent::Error { message } => {
                self.error = Some(message);
                Flow::Stop
            }
            WireEvent::End => {
                self.finished = true;
                Flow::Stop
            }
        }
    }

    pub fn links(&self) -> &[String] {
        &self.urls[..self.urls.len().min(MAX_DISPLAYED_LINKS)]
    }
}

pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url.trim_end_matches('/'))
    }

    /// Send one query and consume its frames until `end`, `error` or close
    ///
    /// A thread announced before a connection failure is still adopted.
    pub async fn send<F>(
        &self,
        conversation: &mut Conversation,
        query: &str,
        on_event: F,
    ) -> anyhow::Result<Turn>
    where
        F: FnMut(&WireEvent),
    {
        let request = ChatRequest {
            query: query.to_string(),
            thread_id: conversation.request_thread_id().to_string(),
        };
        let builder = self.http.post(self.chat_url()).json(&request);
        let mut source = EventSource::new(builder).context("failed to build chat request")?;

        let mut turn = Turn::default();
        let frames = (&mut source)
            .take_while(|event| future::ready(!matches!(event, Err(reqwest_eventsource::Error::StreamEnded))))
            .filter_map(|event| async move {
                match event {
                    Ok(Event::Open) => None,
                    Ok(Event::Message(message)) => Some(Ok(message.data)),
                    Err(e) => Some(Err(anyhow!("connection error: {}", e))),
                }
            });
        let result = consume(frames, &mut turn, on_event).await;
        source.close();

        conversation.absorb(&turn);
        result.map(|()| turn)
    }
}

/// Apply `data:` payloads to the turn until it stops or the frames fail
async fn consume<S, F>(frames: S, turn: &mut Turn, mut on_event: F) -> anyhow::Result<()>
where
    S: Stream<Item = anyhow::Result<String>>,
    F: FnMut(&WireEvent),
{
    let mut frames = pin!(frames);
    while let Some(frame) = frames.next().await {
        let data = frame?;
        let wire: WireEvent = match serde_json::from_str(&data) {
            Ok(wire) => wire,
            Err(e) => {
                warn!("Skipping malformed frame {:?}: {}", data, e);
                continue;
            }
        };
        on_event(&wire);
        if turn.apply(wire) == Flow::Stop {
            break;
        }
    }
    Ok(())
}

fn render(event: &WireEvent) {
    match event {
        WireEvent::Token { text } => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        WireEvent::SearchStart { query } => {
            println!("{}", style(format!("searching the web for \"{}\"...", query)).dim());
        }
        WireEvent::Error { message } => {
            println!("\n{}", style(format!("Error: {}", message)).red());
        }
        _ => {}
    }
}

/// Interactive loop on stdin
pub async fn run_repl(base_url: String, thread_id: Option<String>) -> anyhow::Result<()> {
    let client = ChatClient::new(base_url);
    let mut conversation = Conversation::new(thread_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", style("Type a question, /new for a new conversation, /exit to quit.").dim());
    loop {
        print!("{} ", style(">").bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        match query {
            "" => continue,
            "/exit" => break,
            "/new" => {
                conversation.reset();
                println!("{}", style("Started a new conversation.").dim());
                continue;
            }
            _ => {}
        }

        match client.send(&mut conversation, query, render).await {
            Ok(turn) => {
                println!();
                if !turn.links().is_empty() {
                    println!("\n{}", style("Related links").bold());
                    for url in turn.links() {
                        println!("  {}", style(url).cyan().underlined());
                    }
                }
                println!();
            }
            Err(e) => println!("{}", style(format!("{:#}", e)).red()),
        }
    }
    Ok(())
}
