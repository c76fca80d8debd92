// src/codinfo.rs
//! Decoder for the backslash-packed `codInfo` status strings that game
//! servers return from a `getinfo` query.
//!
//! The string is a flat run of `key\value` pairs. Servers (and the collector
//! that strips the response header) are inconsistent about a leading
//! backslash, so both `\k\v\k\v` and `k\v\k\v` are accepted. Decoding never
//! fails: every absent or unparsable field resolves to its typed default.
use std::collections::HashMap;

use crate::models::server::ServerInfo;

const DELIMITER: char = '\\';

pub fn decode(raw: &str) -> ServerInfo {
    let fields = tokenize(raw);

    let text = |key: &str| fields.get(key).map(|v| v.to_string()).unwrap_or_default();
    let int = |key: &str| fields.get(key).map_or(0, |v| parse_int(v));
    let flag = |key: &str| fields.get(key).map_or(false, |v| parse_bool(v));

    ServerInfo {
        challenge: text("challenge"),
        checksum: text("checksum"),
        is_private: flag("isPrivate"),
        hostname: text("hostname"),
        gamename: text("gamename"),
        sv_maxclients: int("sv_maxclients"),
        gametype: text("gametype"),
        sv_motd: text("sv_motd"),
        xuid: text("xuid"),
        mapname: text("mapname"),
        clients: int("clients"),
        bots: int("bots"),
        protocol: text("protocol"),
        fs_game: text("fs_game"),
        hc: flag("hc"),
        security_level: text("securityLevel"),
        shortversion: text("shortversion"),
        sv_running: flag("sv_running"),
        www_download: text("wwwDownload"),
        www_url: text("wwwUrl"),
    }
}

/// Splits the raw string into key/value pairs. The first occurrence of a key
/// wins, and a trailing key without a value maps to `""`.
fn tokenize(raw: &str) -> HashMap<&str, &str> {
    let body = raw.strip_prefix(DELIMITER).unwrap_or(raw);
    let mut fields = HashMap::new();
    if body.is_empty() {
        return fields;
    }

    let mut tokens = body.split(DELIMITER);
    while let Some(key) = tokens.next() {
        let value = tokens.next().unwrap_or("");
        fields.entry(key).or_insert(value);
    }
    fields
}

/// Numeric-string value of `value`: blank is 0, garbage is 0.
fn parse_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn parse_int(value: &str) -> i32 {
    if let Ok(n) = value.trim().parse::<i32>() {
        return n;
    }
    let n = parse_number(value).trunc();
    if n >= i32::MIN as f64 && n <= i32::MAX as f64 {
        n as i32
    } else {
        0
    }
}

fn parse_bool(value: &str) -> bool {
    parse_number(value) != 0.0
}
