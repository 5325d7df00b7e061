//! Service-area check command.

use console::style;

use crate::config::Settings;
use crate::geo::{round_km, GeoPoint};

pub fn cmd_geo_check(settings: &Settings, lat: f64, lng: f64) -> anyhow::Result<()> {
    let point = GeoPoint::new(lat, lng)?;
    let fence = settings.geofence();
    let distance = round_km(fence.center.distance_km(&point));

    if fence.contains(point) {
        println!(
            "{} Inside the service area ({} km from center, limit {} km)",
            style("✓").green(),
            distance,
            fence.radius_km
        );
    } else {
        println!(
            "{} Outside the service area ({} km from center, limit {} km)",
            style("✗").red(),
            distance,
            fence.radius_km
        );
    }
    Ok(())
}
