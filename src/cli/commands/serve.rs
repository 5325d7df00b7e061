//! Web server command.

use std::net::SocketAddr;

use console::style;

use crate::config::Settings;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4000;

/// Start the API server.
pub async fn cmd_serve(settings: Settings, bind: &str) -> anyhow::Result<()> {
    let addr = parse_bind_address(bind)?;

    println!(
        "{} Starting LigaBairro server at http://{}",
        style("→").cyan(),
        addr
    );
    println!(
        "  Service area: {:.4}, {:.4} ({} km)",
        settings.geo.center.lat, settings.geo.center.lng, settings.geo.radius_km
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, addr).await
}

/// Parse a bind address that can be:
/// - Just a port: "4000" -> 127.0.0.1:4000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:4000
/// - Host and port: "0.0.0.0:4000" -> 0.0.0.0:4000
fn parse_bind_address(bind: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(format!("{}:{}", DEFAULT_HOST, port).parse()?);
    }

    if let Ok(addr) = bind.parse::<SocketAddr>() {
        return Ok(addr);
    }

    format!("{}:{}", bind, DEFAULT_PORT)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {:?}: {}", bind, e))
}
