// [libs/infra/adapters/src/families/nmminer/frame.rs]
//! Parsing for the NMMiner passive telemetry frame (§6): hashrate is a
//! string with a unit suffix, shares are `"rejected/accepted/pct%"`, uptime
//! is `"Dd HH:MM:SS"`.

use chrono::Utc;
use fleet_models::{AdapterError, HashrateUnit, RawTelemetry};
use serde_json::Value;
use std::collections::HashMap;
use std::net::IpAddr;

/// The miner's self-reported IP, if present and parseable (§4.2 step 1).
/// NMMiner boards put this in the payload because the UDP source address
/// can be NATted; the listener prefers this over the packet's source
/// address and only falls back to it when the field is absent or garbage.
pub fn declared_ip(raw: &Value) -> Option<IpAddr> {
    raw.get("ip").and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
}

pub fn parse_frame(raw: &Value) -> Result<RawTelemetry, AdapterError> {
    let (hashrate, hashrate_unit) = raw
        .get("hashrate")
        .and_then(|v| v.as_str())
        .and_then(parse_hashrate)
        .ok_or_else(|| AdapterError::Decode("frame missing a parseable hashrate field".into()))?;

    let (shares_rejected, shares_accepted) = raw.get("shares").and_then(|v| v.as_str()).and_then(parse_shares).unzip();

    let temperature = raw.get("temp").and_then(|v| v.as_f64());
    let power_watts = raw.get("power").and_then(|v| v.as_f64());
    let pool_in_use = raw.get("pool").and_then(|v| v.as_str()).map(str::to_string);
    let firmware_version = raw.get("version").and_then(|v| v.as_str()).map(str::to_string);
    let best_share = raw.get("bestDiff").and_then(|v| v.as_str()).map(str::to_string);

    Ok(RawTelemetry {
        timestamp: Utc::now(),
        hashrate,
        hashrate_unit,
        temperature,
        power_watts,
        shares_accepted,
        shares_rejected,
        pool_in_use,
        detected_mode: None,
        firmware_version,
        best_share,
        data: HashMap::new(),
    })
}

fn parse_hashrate(raw: &str) -> Option<(f64, HashrateUnit)> {
    let raw = raw.trim();
    if let Some(v) = raw.strip_suffix("KH/s") {
        return v.trim().parse::<f64>().ok().map(|v| (v, HashrateUnit::KhPerSec));
    }
    if let Some(v) = raw.strip_suffix("MH/s") {
        return v.trim().parse::<f64>().ok().map(|v| (v, HashrateUnit::MhPerSec));
    }
    // Bare H/s: no HashrateUnit variant below KH/s, so fold into KH/s.
    if let Some(v) = raw.strip_suffix("H/s") {
        return v.trim().parse::<f64>().ok().map(|v| (v / 1e3, HashrateUnit::KhPerSec));
    }
    None
}

/// Parses `"rejected/accepted/pct%"`, returning `(rejected, accepted)`.
fn parse_shares(raw: &str) -> Option<(i64, i64)> {
    let mut parts = raw.split('/');
    let rejected = parts.next()?.trim().parse::<i64>().ok()?;
    let accepted = parts.next()?.trim().parse::<i64>().ok()?;
    Some((rejected, accepted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_share_counts() {
        assert_eq!(parse_shares("3/120/97.5%"), Some((3, 120)));
    }

    #[test]
    fn parses_hashrate_units() {
        assert_eq!(parse_hashrate("512.4KH/s"), Some((512.4, HashrateUnit::KhPerSec)));
        assert_eq!(parse_hashrate("12.0MH/s"), Some((12.0, HashrateUnit::MhPerSec)));
    }

    #[test]
    fn declared_ip_parses_the_ip_field() {
        let raw = serde_json::json!({"ip": "192.168.1.42"});
        assert_eq!(declared_ip(&raw), Some("192.168.1.42".parse().unwrap()));
    }

    #[test]
    fn declared_ip_is_none_when_missing_or_unparseable() {
        assert_eq!(declared_ip(&serde_json::json!({})), None);
        assert_eq!(declared_ip(&serde_json::json!({"ip": "not-an-ip"})), None);
    }
}
