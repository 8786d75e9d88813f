//! Rendering of one write into the bytes appended to a log file
//!
//! Three layouts, all CRLF-terminated:
//!
//! - batch text: a banner line, `[timestamp]`, then `[ category ] message` lines
//! - streaming text: `[timestamp]` followed by `message\r\ncategory` pairs
//! - JSON: one object per write, `timestamp` first, one key per category

use serde_json::Value;

use crate::config::ExecutionMode;

use super::entry::LogBuffer;

/// Separator written before every batch flush in text mode
pub const BANNER: &str = "---------------------------------------------------------------";

const CRLF: &str = "\r\n";

const TIMESTAMP_KEY: &str = "timestamp";

/// Render `batch` for a single append
pub fn render(batch: &LogBuffer, timestamp: &str, json: bool, mode: ExecutionMode) -> String {
    let blocks: Vec<(&str, String)> = batch
        .iter()
        .map(|(category, messages)| {
            let lines: Vec<String> = messages
                .iter()
                .map(|message| {
                    if json {
                        message.render()
                    } else {
                        format!("[ {} ] {}", category, message.render())
                    }
                })
                .collect();
            (category.as_str(), lines.join(CRLF))
        })
        .collect();

    if json {
        render_json(&blocks, timestamp)
    } else if mode.is_streaming() {
        render_streaming(&blocks, timestamp)
    } else {
        render_batch(&blocks, timestamp)
    }
}

fn render_batch(blocks: &[(&str, String)], timestamp: &str) -> String {
    let mut out = format!("{}{}[{}]", BANNER, CRLF, timestamp);
    for (_, text) in blocks {
        out.push_str(CRLF);
        out.push_str(text);
    }
    out.push_str(CRLF);
    out
}

fn render_streaming(blocks: &[(&str, String)], timestamp: &str) -> String {
    let pairs: Vec<String> = blocks
        .iter()
        .map(|(category, text)| format!("{}{}{}", text, CRLF, category))
        .collect();
    format!("[{}]{}{}", timestamp, pairs.join(CRLF), CRLF)
}

// Built by hand so `timestamp` stays first and categories keep their order;
// serde_json leaves non-ASCII and `/` unescaped. A category named `timestamp`
// replaces the timestamp value in place, so keys stay unique.
fn render_json(blocks: &[(&str, String)], timestamp: &str) -> String {
    let first = blocks
        .iter()
        .find(|(category, _)| *category == TIMESTAMP_KEY)
        .map_or(timestamp, |(_, text)| text.as_str());

    let mut out = String::from("{");
    push_json_pair(&mut out, TIMESTAMP_KEY, first);
    for (category, text) in blocks {
        if *category == TIMESTAMP_KEY {
            continue;
        }
        out.push(',');
        push_json_pair(&mut out, category, text);
    }
    out.push('}');
    out.push_str(CRLF);
    out
}

fn push_json_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(&Value::from(key).to_string());
    out.push(':');
    out.push_str(&Value::from(value).to_string());
}
