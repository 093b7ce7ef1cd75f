//! Command-line client for the textflag API.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::time::{Duration, Instant};
use textflag_core::constants::DEFAULT_CLI_SERVER_URL;
use textflag_core::text::{char_slice, normalize_optional_nonempty};

#[derive(Parser)]
#[command(name = "tflag", about = "textflag CLI", version)]
struct Cli {
    /// Server URL (can also be set via TF_SERVER env var)
    #[arg(short, long, env = "TF_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Print timing for API requests
    #[arg(long, global = true)]
    timing: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// List documents
    Documents,
    /// Create a document from a file or stdin
    New {
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Print a document's markup, or its plain text with --plain
    Show {
        doc: u64,
        #[arg(long)]
        plain: bool,
    },
    /// List a document's flags
    Flags { doc: u64 },
    /// Resolve a selection to absolute offsets without storing it
    Select {
        doc: u64,
        /// Anchor node id
        node: usize,
        /// Offset inside the anchor node
        offset: usize,
        /// Selected text as the user saw it
        text: String,
        /// Focus node id (defaults to the anchor node)
        #[arg(long)]
        end_node: Option<usize>,
        /// Offset inside the focus node
        #[arg(long, requires = "end_node")]
        end_offset: Option<usize>,
        /// Skip the overlap check against stored flags
        #[arg(long)]
        allow_overlap: bool,
    },
    /// Flag the range [start, end) of a document
    Flag {
        doc: u64,
        start: usize,
        end: usize,
        #[arg(short, long, default_value = "yellow")]
        color: String,
        /// Expected text; read from the document when omitted
        #[arg(long)]
        text: Option<String>,
    },
    /// Delete a single flag
    Delete { id: u64 },
    /// Delete every flag of a document
    Clear { doc: u64 },
    /// Export a document's flags as CSV
    Export {
        doc: u64,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Import flags from a CSV file or stdin
    Import {
        doc: u64,
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Print a document with its flags highlighted
    Render { doc: u64 },
}

fn log_timing(timing: bool, label: &str, duration: Duration) {
    if timing {
        eprintln!(
            "[timing] {}: {:.1} ms",
            label,
            duration.as_secs_f64() * 1000.0
        );
    }
}

fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .unwrap_or(body)
            .to_string(),
        Err(_) => body.to_string(),
    }
}

fn fail(action: &str, message: impl std::fmt::Display) -> ! {
    eprintln!("{} failed: {}", action, message);
    std::process::exit(1);
}

async fn send_or_exit(
    request: reqwest::RequestBuilder,
    action: &str,
    timing: bool,
) -> Result<reqwest::Response, reqwest::Error> {
    let started = Instant::now();
    let res = request.send().await?;
    log_timing(timing, action, started.elapsed());

    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    eprintln!(
        "{} failed ({}): {}",
        action,
        status,
        error_message_for_response(status, &body)
    );
    std::process::exit(1);
}

fn encode_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("response encoding error: {}", err))
}

fn preview(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

fn format_documents_output(documents: &[Value], json: bool) -> Result<String, String> {
    if json {
        return encode_pretty(&documents);
    }

    let mut rows = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        let id = document.get("id").and_then(Value::as_u64);
        let content = document.get("content").and_then(Value::as_str);
        let (Some(id), Some(content)) = (id, content) else {
            return Err(format!(
                "response item {} missing 'id' or 'content' field",
                index
            ));
        };
        rows.push(format!("{:<6} {}", id, preview(content, 60)));
    }
    Ok(rows.join("\n"))
}

struct FlagRow<'a> {
    id: u64,
    start: u64,
    end: u64,
    color: &'a str,
    text: &'a str,
}

fn flag_row(flag: &Value) -> Option<FlagRow<'_>> {
    Some(FlagRow {
        id: flag.get("id")?.as_u64()?,
        start: flag.get("startOffset")?.as_u64()?,
        end: flag.get("endOffset")?.as_u64()?,
        color: flag.get("color")?.as_str()?,
        text: flag.get("text")?.as_str()?,
    })
}

fn format_flags_output(flags: &[Value], json: bool) -> Result<String, String> {
    if json {
        return encode_pretty(&flags);
    }

    let mut rows = Vec::with_capacity(flags.len());
    for (index, flag) in flags.iter().enumerate() {
        let row = flag_row(flag)
            .ok_or_else(|| format!("response item {} is not a complete flag", index))?;
        rows.push(format!(
            "{:<6} {:>6}..{:<6} {:<8} {:?}",
            row.id, row.start, row.end, row.color, row.text
        ));
    }
    Ok(rows.join("\n"))
}

fn format_selection_output(selection: &Value, json: bool) -> Result<String, String> {
    if json {
        return encode_pretty(selection);
    }

    let start = selection.get("start").and_then(Value::as_u64);
    let end = selection.get("end").and_then(Value::as_u64);
    let text = selection.get("text").and_then(Value::as_str);
    match (start, end, text) {
        (Some(start), Some(end), Some(text)) => Ok(format!("{}..{} {:?}", start, end, text)),
        _ => Err("response missing 'start', 'end' or 'text' field".to_string()),
    }
}

fn field_output(value: &Value, field: &str, json: bool) -> Result<String, String> {
    if json {
        return encode_pretty(value);
    }
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("response missing '{}' field", field))
}

fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(server)
        .map_err(|err| format!("Invalid server URL '{}': {}", server, err))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| "Server URL cannot be used as an API base".to_string())?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

fn document_url(server: &str, action: &str, doc: u64, tail: &[&str]) -> reqwest::Url {
    let doc = doc.to_string();
    let mut segments = vec!["api", "documents", doc.as_str()];
    segments.extend_from_slice(tail);
    api_url(server, &segments).unwrap_or_else(|message| fail(action, message))
}

fn normalize_server(server: String) -> String {
    let Ok(mut url) = reqwest::Url::parse(&server) else {
        return server;
    };
    let is_plain_localhost =
        url.scheme().eq_ignore_ascii_case("http") && url.host_str() == Some("localhost");
    if is_plain_localhost && url.set_host(Some("127.0.0.1")).is_err() {
        return server;
    }
    url.to_string().trim_end_matches('/').to_string()
}

fn resolve_server(server: Option<String>) -> String {
    normalize_server(
        normalize_optional_nonempty(server).unwrap_or_else(|| DEFAULT_CLI_SERVER_URL.to_string()),
    )
}

fn read_input(file: Option<String>) -> io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn print_nonempty(output: String) {
    if !output.is_empty() {
        println!("{}", output);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        server,
        json,
        timing,
        timeout,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;
    let server = resolve_server(server);

    match command {
        Commands::Completions { .. } => {}
        Commands::Documents => {
            let url = api_url(&server, &["api", "documents"])
                .unwrap_or_else(|message| fail("Documents", message));
            let res = send_or_exit(client.get(url), "Documents", timing).await?;
            let documents: Vec<Value> = res.json().await?;
            let output = format_documents_output(&documents, json)
                .unwrap_or_else(|message| fail("Documents", message));
            print_nonempty(output);
        }
        Commands::New { file } => {
            let url = api_url(&server, &["api", "documents"])
                .unwrap_or_else(|message| fail("New", message));
            let content = read_input(file)?;
            let res = send_or_exit(
                client.post(url).json(&json!({ "content": content })),
                "New",
                timing,
            )
            .await?;
            let document: Value = res.json().await?;
            if json {
                println!("{}", encode_pretty(&document)?);
            } else {
                let id = document
                    .get("id")
                    .and_then(Value::as_u64)
                    .unwrap_or_else(|| fail("New", "response missing 'id' field"));
                println!("Created document {}", id);
            }
        }
        Commands::Show { doc, plain } => {
            let (tail, field): (&[&str], &str) = if plain {
                (&["plain"], "text")
            } else {
                (&[], "content")
            };
            let url = document_url(&server, "Show", doc, tail);
            let res = send_or_exit(client.get(url), "Show", timing).await?;
            let body: Value = res.json().await?;
            let output =
                field_output(&body, field, json).unwrap_or_else(|message| fail("Show", message));
            println!("{}", output);
        }
        Commands::Flags { doc } => {
            let url = document_url(&server, "Flags", doc, &["flags"]);
            let res = send_or_exit(client.get(url), "Flags", timing).await?;
            let flags: Vec<Value> = res.json().await?;
            let output =
                format_flags_output(&flags, json).unwrap_or_else(|message| fail("Flags", message));
            print_nonempty(output);
        }
        Commands::Select {
            doc,
            node,
            offset,
            text,
            end_node,
            end_offset,
            allow_overlap,
        } => {
            let url = document_url(&server, "Select", doc, &["selection"]);
            let mut body = json!({
                "start": { "node": node, "offset": offset },
                "text": text,
                "checkOverlap": !allow_overlap,
            });
            if let Some(end_node) = end_node {
                body["end"] = json!({ "node": end_node, "offset": end_offset.unwrap_or(0) });
            }
            let res = send_or_exit(client.post(url).json(&body), "Select", timing).await?;
            let selection: Value = res.json().await?;
            let output = format_selection_output(&selection, json)
                .unwrap_or_else(|message| fail("Select", message));
            println!("{}", output);
        }
        Commands::Flag {
            doc,
            start,
            end,
            color,
            text,
        } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let url = document_url(&server, "Flag", doc, &["plain"]);
                    let res = send_or_exit(client.get(url), "Flag", timing).await?;
                    let plain: Value = res.json().await?;
                    let plain = plain.get("text").and_then(Value::as_str).unwrap_or_default();
                    char_slice(plain, start, end)
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            fail("Flag", format!("range {}..{} is outside the document", start, end))
                        })
                }
            };
            let url = document_url(&server, "Flag", doc, &["flags"]);
            let body = json!({
                "text": text,
                "color": color,
                "startOffset": start,
                "endOffset": end,
            });
            let res = send_or_exit(client.post(url).json(&body), "Flag", timing).await?;
            let flag: Value = res.json().await?;
            if json {
                println!("{}", encode_pretty(&flag)?);
            } else {
                let row = flag_row(&flag)
                    .unwrap_or_else(|| fail("Flag", "response is not a complete flag"));
                println!("Flagged {}..{} as {} (id {})", row.start, row.end, row.color, row.id);
            }
        }
        Commands::Delete { id } => {
            let id_segment = id.to_string();
            let url = api_url(&server, &["api", "flags", id_segment.as_str()])
                .unwrap_or_else(|message| fail("Delete", message));
            send_or_exit(client.delete(url), "Delete", timing).await?;
            if json {
                println!("{}", encode_pretty(&json!({ "deleted": id }))?);
            } else {
                println!("Deleted flag {}", id);
            }
        }
        Commands::Clear { doc } => {
            let url = document_url(&server, "Clear", doc, &["flags"]);
            let res = send_or_exit(client.delete(url), "Clear", timing).await?;
            let body: Value = res.json().await?;
            if json {
                println!("{}", encode_pretty(&body)?);
            } else {
                let deleted = body.get("deleted").and_then(Value::as_u64).unwrap_or(0);
                println!("Deleted {} flag(s) from document {}", deleted, doc);
            }
        }
        Commands::Export { doc, output } => {
            let url = document_url(&server, "Export", doc, &["flags", "export"]);
            let res = send_or_exit(client.get(url), "Export", timing).await?;
            let csv = res.text().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    eprintln!("Wrote {}", path);
                }
                None => print!("{}", csv),
            }
        }
        Commands::Import { doc, file } => {
            let url = document_url(&server, "Import", doc, &["flags", "import"]);
            let csv = read_input(file)?;
            let request = client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "text/csv")
                .body(csv);
            let res = send_or_exit(request, "Import", timing).await?;
            let body: Value = res.json().await?;
            if json {
                println!("{}", encode_pretty(&body)?);
            } else {
                let imported = body.get("imported").and_then(Value::as_u64).unwrap_or(0);
                println!("Imported {} flag(s) into document {}", imported, doc);
            }
        }
        Commands::Render { doc } => {
            let url = document_url(&server, "Render", doc, &["rendered"]);
            let res = send_or_exit(client.get(url), "Render", timing).await?;
            let rendered: Value = res.json().await?;
            let output =
                field_output(&rendered, "html", json).unwrap_or_else(|message| fail("Render", message));
            println!("{}", output);
            if !json {
                if let Some(skipped) = rendered.get("skipped").and_then(Value::as_array) {
                    for entry in skipped {
                        eprintln!(
                            "skipped flag {}: {}",
                            entry.get("flagId").unwrap_or(&Value::Null),
                            entry.get("reason").and_then(Value::as_str).unwrap_or("unknown")
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
