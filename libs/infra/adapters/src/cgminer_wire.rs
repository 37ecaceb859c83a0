// [libs/infra/adapters/src/cgminer_wire.rs]
//! Wire framing for the fixed-slot family's cgminer-API JSON RPC over TCP
//! (§6): `{"command": <verb>, "parameter": <args>}`, response is one or more
//! JSON objects, frequently NUL-terminated, read until the connection closes
//! or the timeout fires.

use fleet_models::AdapterError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn send_command(host: &str, port: u16, command: &str, parameter: &str) -> Result<serde_json::Value, AdapterError> {
    let request = serde_json::json!({ "command": command, "parameter": parameter });
    let payload = serde_json::to_vec(&request).map_err(|e| AdapterError::Decode(e.to_string()))?;

    let connect = TcpStream::connect((host, port));
    let mut stream = timeout(CALL_TIMEOUT, connect)
        .await
        .map_err(|_| AdapterError::Timeout(CALL_TIMEOUT))?
        .map_err(|e| AdapterError::Unreachable(e.to_string()))?;

    timeout(CALL_TIMEOUT, stream.write_all(&payload))
        .await
        .map_err(|_| AdapterError::Timeout(CALL_TIMEOUT))?
        .map_err(|e| AdapterError::Unreachable(e.to_string()))?;

    let mut buf = Vec::new();
    let read = timeout(CALL_TIMEOUT, stream.read_to_end(&mut buf)).await;
    // cgminer-API servers close the connection after responding; a timeout
    // here with data already buffered is still a usable response.
    if read.is_err() && buf.is_empty() {
        return Err(AdapterError::Timeout(CALL_TIMEOUT));
    }

    let text = String::from_utf8_lossy(&buf);
    let cleaned = text.trim_matches('\0').trim();
    let object = first_balanced_object(cleaned).ok_or_else(|| AdapterError::Decode("no JSON object in response".into()))?;
    serde_json::from_str(object).map_err(|e| AdapterError::Decode(e.to_string()))
}

/// Extracts the first balanced `{…}` substring, tolerating braces nested
/// inside string literals.
fn first_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts the value of a `KEY[value]` bracketed token from a raw cgminer
/// status string (e.g. `MM ID0` field contents).
pub fn extract_bracketed<'a>(raw: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{key}[");
    let start = raw.find(&needle)? + needle.len();
    let end = raw[start..].find(']')? + start;
    Some(&raw[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bracketed_tokens() {
        let raw = "MM ID0: TAvg[52] MPO[8.1] WORKMODE[1]";
        assert_eq!(extract_bracketed(raw, "TAvg"), Some("52"));
        assert_eq!(extract_bracketed(raw, "MPO"), Some("8.1"));
        assert_eq!(extract_bracketed(raw, "WORKMODE"), Some("1"));
        assert_eq!(extract_bracketed(raw, "MISSING"), None);
    }

    #[test]
    fn finds_first_balanced_object_ignoring_nested_braces_in_strings() {
        let raw = "\0{\"a\": \"{not a brace}\", \"b\": {\"c\": 1}}\0trailing";
        let obj = first_balanced_object(raw).unwrap();
        assert!(obj.starts_with("{\"a\""));
        assert!(obj.ends_with("}}"));
    }
}
