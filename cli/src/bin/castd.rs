//! callsheet-castd — reference tool server for the callsheet wire protocol.
//!
//! Speaks newline-delimited JSON on stdin/stdout and exits on stdin EOF
//! (the graceful-close signal). All diagnostics go to stderr; the protocol
//! stream carries nothing else.
//!
//! Operating parameters come exclusively from environment variables set by
//! the spawning channel — never from the message stream:
//!
//! - `CALLSHEET_CAST_TABLE` — table identifier (required)
//! - `CALLSHEET_CAST_TABLE_PATH` — JSON array file of rows (required)
//! - `CALLSHEET_CAST_KEY_ATTRIBUTE` — partition key attribute
//!   (default `cast_id`)

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};

use callsheet_domain::tool::entities::{ParamType, ToolDefinition, ToolParameter};
use callsheet_infrastructure::channel::protocol::{CallPayload, WireBody, WireMessage};

type Row = serde_json::Map<String, serde_json::Value>;

fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_cast_info",
            "Look up cast member details by cast id. Returns the matching rows, or an empty list.",
        )
        .with_parameter(ToolParameter::new(
            "cast_id",
            "The cast member's partition key",
            true,
        )),
        ToolDefinition::new(
            "describe_table",
            "Describe the cast table served by this tool server.",
        )
        .with_parameter(
            ToolParameter::new("include_rows", "Include the row count", false)
                .with_type(ParamType::Boolean),
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let table =
        std::env::var("CALLSHEET_CAST_TABLE").context("CALLSHEET_CAST_TABLE is not set")?;
    let path = std::env::var("CALLSHEET_CAST_TABLE_PATH")
        .context("CALLSHEET_CAST_TABLE_PATH is not set")?;
    let key_attribute = std::env::var("CALLSHEET_CAST_KEY_ATTRIBUTE")
        .unwrap_or_else(|_| "cast_id".to_string());

    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("reading table file {}", path))?;
    let rows: Vec<Row> =
        serde_json::from_str(&raw).with_context(|| format!("parsing table file {}", path))?;
    eprintln!(
        "callsheet-castd: serving table `{}` ({} rows, key `{}`)",
        table,
        rows.len(),
        key_attribute
    );

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let message = match WireMessage::decode(&line) {
            Ok(message) => message,
            Err(e) => {
                eprintln!("callsheet-castd: discarding unparseable frame: {}", e);
                continue;
            }
        };
        if let Some(reply) = handle(message, &table, &key_attribute, &rows) {
            write_frame(&mut stdout, &reply).await?;
        }
    }

    eprintln!("callsheet-castd: input stream closed, exiting");
    Ok(())
}

fn handle(
    message: WireMessage,
    table: &str,
    key_attribute: &str,
    rows: &[Row],
) -> Option<WireMessage> {
    match message.body {
        WireBody::ListTools { .. } => Some(WireMessage::catalog(message.id, catalog())),
        WireBody::ToolCall { payload } => {
            let Some(id) = message.id else {
                eprintln!("callsheet-castd: tool_call without correlation id");
                return None;
            };
            Some(dispatch(id, payload, table, key_attribute, rows))
        }
        other => {
            eprintln!("callsheet-castd: unexpected `{}` frame", other.kind_name());
            None
        }
    }
}

fn dispatch(
    id: u64,
    payload: CallPayload,
    table: &str,
    key_attribute: &str,
    rows: &[Row],
) -> WireMessage {
    match payload.name.as_str() {
        "get_cast_info" => {
            let Some(cast_id) = payload.arguments.get("cast_id").and_then(|v| v.as_str()) else {
                return WireMessage::error(
                    Some(id),
                    "invalid_argument",
                    "missing required argument `cast_id`",
                );
            };
            let matches: Vec<serde_json::Value> = rows
                .iter()
                .filter(|row| row.get(key_attribute).and_then(|v| v.as_str()) == Some(cast_id))
                .cloned()
                .map(serde_json::Value::Object)
                .collect();
            WireMessage::tool_result(id, serde_json::Value::Array(matches))
        }
        "describe_table" => {
            let mut value = serde_json::json!({
                "table": table,
                "key_attribute": key_attribute,
            });
            if payload
                .arguments
                .get("include_rows")
                .and_then(|v| v.as_bool())
                .unwrap_or(true)
            {
                value["row_count"] = serde_json::json!(rows.len());
            }
            WireMessage::tool_result(id, value)
        }
        other => WireMessage::error(
            Some(id),
            "unknown_tool",
            format!("no such tool: {}", other),
        ),
    }
}

async fn write_frame(stdout: &mut Stdout, message: &WireMessage) -> Result<()> {
    let line = message.encode()?;
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
