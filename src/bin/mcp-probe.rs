use clap::{Parser, Subcommand};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use figma_mcp_proxy::transport::ENDPOINT_EVENT;

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(name = "mcp-probe")]
#[command(about = "Diagnostic client for the Figma MCP proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Seconds to wait for each reply.
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,
    /// List available tools
    Tools,
    /// Call a tool with JSON arguments
    Call {
        name: String,
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// List resources
    Resources,
    /// Read one resource
    Read { uri: String },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let base = Url::parse(&cli.url)?;
    let client = reqwest::Client::new();

    let (method, params) = match cli.command {
        Commands::Health => {
            let res = client.get(base.join("/health")?).send().await?;
            return print_response(res).await;
        }
        Commands::Tools => ("tools/list", json!({})),
        Commands::Call { name, args } => {
            let arguments: Value = serde_json::from_str(&args)?;
            ("tools/call", json!({"name": name, "arguments": arguments}))
        }
        Commands::Resources => ("resources/list", json!({})),
        Commands::Read { uri } => ("resources/read", json!({"uri": uri})),
    };

    let mut session = Session::connect(client, &base, Duration::from_secs(cli.timeout)).await?;
    eprintln!("Connected: {}", session.message_url);

    let init = session
        .request(
            1,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "mcp-probe", "version": env!("CARGO_PKG_VERSION")},
            }),
        )
        .await?;
    eprintln!(
        "Server: {} {}",
        init["result"]["serverInfo"]["name"].as_str().unwrap_or("?"),
        init["result"]["serverInfo"]["version"].as_str().unwrap_or("?")
    );
    session.notify("notifications/initialized").await?;

    let reply = session.request(2, method, params).await?;
    print_reply(&reply)?;
    Ok(())
}

/// An open event stream plus the endpoint it announced.
struct Session {
    client: reqwest::Client,
    events: BoxStream<'static, Result<Event, EventStreamError<reqwest::Error>>>,
    message_url: Url,
    timeout: Duration,
}

impl Session {
    async fn connect(client: reqwest::Client, base: &Url, timeout: Duration) -> Result<Self, BoxError> {
        let response = client.get(base.join("/sse")?).send().await?.error_for_status()?;
        let mut session = Self {
            client,
            events: response.bytes_stream().eventsource().boxed(),
            message_url: base.clone(),
            timeout,
        };

        let endpoint = loop {
            let event = session.next_event().await?;
            if event.event == ENDPOINT_EVENT {
                break event.data;
            }
        };
        session.message_url = base.join(&endpoint)?;
        Ok(session)
    }

    async fn next_event(&mut self) -> Result<Event, BoxError> {
        let event = tokio::time::timeout(self.timeout, self.events.next())
            .await
            .map_err(|_| "timed out waiting for the event stream")?
            .ok_or("event stream ended")?
            .map_err(|err| format!("event stream failed: {err}"))?;
        Ok(event)
    }

    async fn post(&self, message: Value) -> Result<(), BoxError> {
        self.client
            .post(self.message_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(message.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn notify(&self, method: &str) -> Result<(), BoxError> {
        self.post(json!({"jsonrpc": "2.0", "method": method})).await
    }

    /// Post a request and wait for the reply carrying its id.
    async fn request(&mut self, id: u64, method: &str, params: Value) -> Result<Value, BoxError> {
        self.post(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await?;

        loop {
            let event = self.next_event().await?;
            let reply: Value = serde_json::from_str(&event.data)?;
            if reply["id"] == json!(id) {
                return Ok(reply);
            }
        }
    }
}

fn print_reply(reply: &Value) -> Result<(), BoxError> {
    if let Some(error) = reply.get("error") {
        eprintln!("Error: {}", serde_json::to_string_pretty(error)?);
        std::process::exit(1);
    }

    // Tool results carry their payload as text; print it as-is.
    let result = &reply["result"];
    match result["content"].as_array() {
        Some(content) => {
            for item in content {
                println!("{}", item["text"].as_str().unwrap_or_default());
            }
            if result["isError"] == json!(true) {
                std::process::exit(1);
            }
        }
        None => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), BoxError> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("{}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
