// src/models/server.rs
use serde::{Deserialize, Serialize};

/// Decoded contents of a `codInfo` status string.
///
/// Field names follow the keys the game server reports, which is also the
/// JSON shape existing API clients consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub challenge: String,
    pub checksum: String,
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
    pub hostname: String,
    pub gamename: String,
    pub sv_maxclients: i32,
    pub gametype: String,
    pub sv_motd: String,
    pub xuid: String,
    pub mapname: String,
    pub clients: i32,
    pub bots: i32,
    pub protocol: String,
    pub fs_game: String,
    pub hc: bool,
    #[serde(rename = "securityLevel")]
    pub security_level: String,
    pub shortversion: String,
    pub sv_running: bool,
    #[serde(rename = "wwwDownload")]
    pub www_download: String,
    #[serde(rename = "wwwUrl")]
    pub www_url: String,
}

/// One game server as served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(flatten)]
    pub info: ServerInfo,
    pub ip: String,
    pub port: i32,
    pub game: String,
}

/// One entry of a `servers_*.json` file as written by the collector.
#[derive(Debug, Clone, Deserialize)]
pub struct RawServerEntry {
    pub ip: String,
    pub port: i32,
    pub game: String,
    #[serde(rename = "codInfo", default)]
    pub cod_info: String,
}

impl ServerRecord {
    /// `lowered` must already be lowercase. Compares without allocating.
    pub fn is_game(&self, lowered: &str) -> bool {
        self.game.chars().flat_map(char::to_lowercase).eq(lowered.chars())
    }
}
