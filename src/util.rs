use std::net::SocketAddr;
use std::path::PathBuf;

const BIND_ADDR: &str = "FEVER_BIND_ADDR";

pub fn get_bind_addr() -> Option<SocketAddr> {
    std::env::var(BIND_ADDR).ok().and_then(|res| res.parse().ok())
}

const AUTH_TOKEN: &str = "FEVER_AUTH_TOKEN";

pub fn get_auth_token() -> Option<String> {
    std::env::var(AUTH_TOKEN).ok().filter(|token| !token.is_empty())
}

const DB_PATH: &str = "FEVER_DB_PATH";

pub fn get_db_path() -> Option<PathBuf> {
    std::env::var(DB_PATH).ok().map(PathBuf::from)
}
