// [libs/domain/strategy/src/solopool.rs]
//! Recognises whether a pool endpoint is a solopool.org solo-mining endpoint
//! for a given coin, by host/port pattern rather than the operator-editable
//! pool name. Used by the Agile Solo validation gate (§4.5) when a band's
//! `target_coin` has no pool whose name matches, but a solopool.org endpoint
//! for that coin is configured under a different name.

/// solopool.org's well-known per-coin stratum ports. Matches a small,
/// deliberately incomplete set — anything not listed here falls back to
/// name-based matching.
fn known_port_for_coin(coin: &str) -> Option<u16> {
    match coin.to_ascii_uppercase().as_str() {
        "BTC" => Some(8005),
        "BCH" => Some(8002),
        "DGB" => Some(8004),
        "XMR" => Some(8010),
        _ => None,
    }
}

pub fn is_solopool_pool(host: &str, port: u16, coin: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    if !host.ends_with("solopool.org") {
        return false;
    }
    match known_port_for_coin(coin) {
        Some(expected_port) => port == expected_port,
        // Unknown coin: accept any solopool.org host that names the coin as
        // a subdomain component, e.g. `bch.solopool.org`.
        None => host.starts_with(&format!("{}.", coin.to_ascii_lowercase())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_coin_port() {
        assert!(is_solopool_pool("bch.solopool.org", 8002, "BCH"));
        assert!(!is_solopool_pool("bch.solopool.org", 8005, "BCH"));
    }

    #[test]
    fn rejects_non_solopool_host() {
        assert!(!is_solopool_pool("eu.viabtc.com", 8002, "BCH"));
    }

    #[test]
    fn falls_back_to_subdomain_match_for_unknown_coin() {
        assert!(is_solopool_pool("ltc.solopool.org", 8866, "LTC"));
    }
}
