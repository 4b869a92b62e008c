//! Config - CLI 引数と環境変数

use std::net::SocketAddr;

use clap::Parser;

/// HTTP proxy in front of the video generation backend.
#[derive(Debug, Clone, Parser)]
#[command(name = "vidgen-server", version)]
pub struct Config {
    /// API root of the video backend.
    #[arg(long, env = "VIDGEN_BACKEND_URL", default_value = "http://localhost:8000/api")]
    pub backend_url: String,

    /// Address to listen on.
    #[arg(long, env = "VIDGEN_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["vidgen-server"]).unwrap();

        assert_eq!(config.backend_url, "http://localhost:8000/api");
        assert_eq!(config.bind, "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "vidgen-server",
            "--backend-url",
            "http://render:9000/api",
            "--bind",
            "0.0.0.0:8080",
        ])
        .unwrap();

        assert_eq!(config.backend_url, "http://render:9000/api");
        assert_eq!(config.bind.port(), 8080);
    }
}
