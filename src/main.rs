use crate::acquisition::geocoder::Geocoder;
use crate::acquisition::operator::ConsoleInput;
use crate::acquisition::positioning::FeedPositioningSource;
use crate::acquisition::{LocationService, ip_lookup};
use crate::app_config::AppConfig;
use crate::domain::{AcquisitionMethod, LocationMetadata};
use crate::session::SurveySession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod acquisition;
mod app_config;
mod domain;
mod fusion;
mod geometry;
mod session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🛰️ Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load();
    info!("✅  Loaded configuration");

    let client = reqwest::Client::new();
    let ip_estimate = ip_lookup::lookup(&client, config.ip_lookup().url()).await;
    if let Some(estimate) = &ip_estimate {
        info!("✅  Coarse IP estimate: {}, {}", estimate.city, estimate.country);
    }

    let service = LocationService::new(
        Box::new(FeedPositioningSource::new(config.positioning().feed_path(), config.positioning().fix_timeout())),
        Box::new(ConsoleInput),
        Geocoder::new(client, config.geocoder().url()),
        ip_estimate,
        config.fusion().clone(),
    );
    let session = SurveySession::new(service);

    let mut accuracy_rx = session.accuracy_updates();
    tokio::task::spawn(async move {
        while accuracy_rx.changed().await.is_ok() {
            let accuracy = *accuracy_rx.borrow_and_update();
            info!("📡 Current accuracy ±{}m", accuracy);
        }
    });

    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    run_console(&session).await?;

    Ok(())
}

async fn run_console(session: &SurveySession) -> Result<(), std::io::Error> {
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("method") => match parts.next() {
                Some("gps") => session.select_method(AcquisitionMethod::EnhancedGps).await,
                Some("manual") => session.select_method(AcquisitionMethod::Manual).await,
                Some("ip") => session.select_method(AcquisitionMethod::IpLocation).await,
                Some("address") => session.select_method(AcquisitionMethod::Geocoding).await,
                _ => println!("Usage: method <gps|manual|ip|address>"),
            },
            Some("vertex") => match session.register_area_vertex().await {
                Ok(registration) if registration.area_defined => println!("Vertex {} registered, building area defined", registration.step),
                Ok(registration) => println!(
                    "Vertex {} registered at ±{}m, {} to go",
                    registration.step,
                    registration.location.accuracy_m,
                    crate::session::AREA_VERTEX_COUNT - registration.step
                ),
                Err(e) => println!("Could not register vertex: {}", e),
            },
            Some("point") => {
                let id = parts.next().unwrap_or("ID1");
                match session.register_point(id).await {
                    Ok(point) => {
                        println!(
                            "Point '{}' at {}, {} (±{}m, {}) is {}",
                            point.id,
                            point.location.coordinate.lat,
                            point.location.coordinate.lng,
                            point.location.accuracy_m,
                            point.location.method,
                            if point.inside { "INSIDE" } else { "OUTSIDE" }
                        );
                        let vertices: Vec<String> = point.vertex_distances.iter().enumerate().map(|(i, d)| format!("V{}: {}m", i + 1, d)).collect();
                        println!("Distances to vertices: {}", vertices.join(", "));
                        let sides: Vec<String> = point.side_distances.iter().enumerate().map(|(i, d)| format!("S{}: {}m", i + 1, d)).collect();
                        println!("Distances to sides: {}", sides.join(", "));
                    }
                    Err(e) => println!("Could not register point: {}", e),
                }
            }
            Some("reset") => {
                session.reset_area().await;
                println!("Building area cleared, registered points kept");
            }
            Some("status") => print_status(session).await,
            Some("help") => print_help(),
            Some("quit") | Some("exit") => break,
            Some(command) => println!("Unknown command '{}', type 'help'", command),
            None => {}
        }
    }

    Ok(())
}

async fn print_status(session: &SurveySession) {
    println!("Method: {}", session.method().await);
    if session.is_area_defined().await {
        println!("Building area defined:");
        for (i, vertex) in session.vertices().await.iter().enumerate() {
            println!("  V{}: {}, {} (±{}m, {})", i + 1, vertex.coordinate.lat, vertex.coordinate.lng, vertex.accuracy_m, vertex.method);
        }
    } else {
        println!("Collecting building area, next vertex: {}/{}", session.step().await, crate::session::AREA_VERTEX_COUNT);
    }

    let points = session.points().await;
    if points.is_empty() {
        println!("No points registered");
    }
    for point in points {
        let extra = match &point.location.metadata {
            LocationMetadata::Fusion { readings_used, total_readings } => format!(" ({}/{} readings)", readings_used, total_readings),
            LocationMetadata::Place { city, country } => format!(" ({}, {})", city, country),
            LocationMetadata::Address { display_name } => format!(" ({})", display_name),
            LocationMetadata::None => String::new(),
        };
        println!(
            "  {} [{}]: {}, {} is {} ±{}m{}",
            point.id,
            point.timestamp.format("%H:%M:%S"),
            point.location.coordinate.lat,
            point.location.coordinate.lng,
            if point.inside { "INSIDE" } else { "OUTSIDE" },
            point.location.accuracy_m,
            extra
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  method <gps|manual|ip|address>  select the acquisition method");
    println!("  vertex                          register the next area vertex");
    println!("  point <id>                      register a measurement point");
    println!("  reset                           clear the building area");
    println!("  status                          show the area and registered points");
    println!("  quit                            exit");
}
