use pelorus_core::{PrimitiveValue, Severity, Zone};
use pelorus_engine::{DataService, IdentityConverter};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pelorus_engine=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Pelorus demo starting...");

    let mut service = DataService::new(Arc::new(IdentityConverter));
    service.set_zones(vec![Zone {
        path: "self.navigation.speedOverGround".to_string(),
        unit: None,
        lower: Some(4.0),
        upper: None,
        severity: Severity::Alarm,
        message: Some("Speed over ground too high".to_string()),
    }]);

    // The simulated server announces itself before any data
    let self_urn = format!("vessels.urn:mrn:signalk:uuid:{}", uuid::Uuid::new_v4());
    service.handle_delta_text(&format!(r#"{{"self":"{self_urn}","roles":[]}}"#))?;

    // Two dashboard widgets watching the same path
    let sog_default = service.subscribe("sog-gauge", "self.navigation.speedOverGround", "default");
    let position = service.subscribe("chart", "self.navigation.position.latitude", "default");
    let mut sog_rx = sog_default.updates();
    let mut position_rx = position.updates();
    let mut alarms = service.alarm_events();
    let stats = service.stats_stream();

    let mut boat = Boat::new(&self_urn);
    let mut delta_interval = tokio::time::interval(tokio::time::Duration::from_millis(500));
    let mut stats_interval = tokio::time::interval(tokio::time::Duration::from_secs(1));

    tracing::info!("Feeding simulated deltas, Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = delta_interval.tick() => {
                service.handle_delta_text(&boat.next_delta())?;
            }
            _ = stats_interval.tick() => {
                service.tick_second();
                let snapshot = stats.borrow().clone();
                tracing::info!(
                    rate = snapshot.per_second.last().copied().unwrap_or(0),
                    total = snapshot.total,
                    paths = service.path_count(),
                    "throughput"
                );
            }
            Ok(()) = sog_rx.changed() => {
                let update = sog_rx.borrow_and_update().clone();
                if let Some(PrimitiveValue::Number(sog)) = update.value {
                    tracing::info!(sog = format!("{sog:.2}"), state = ?update.state, "speed over ground");
                }
            }
            Ok(()) = position_rx.changed() => {
                let update = position_rx.borrow_and_update().clone();
                if let Some(PrimitiveValue::Number(lat)) = update.value {
                    tracing::debug!(latitude = format!("{lat:.5}"), "position");
                }
            }
            Ok(event) = alarms.recv() => {
                tracing::warn!(
                    path = %event.path,
                    action = ?event.action,
                    severity = ?event.severity,
                    message = event.message.as_deref().unwrap_or(""),
                    "alarm"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    service.unsubscribe("sog-gauge", "self.navigation.speedOverGround");
    service.unsubscribe("chart", "self.navigation.position.latitude");
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Simulated boat state, drifting north-east with an oscillating speed
/// that periodically crosses the demo alarm threshold.
struct Boat {
    context: String,
    latitude: f64,
    longitude: f64,
    phase: f64,
}

impl Boat {
    fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            latitude: 52.0987654,
            longitude: 4.9876545,
            phase: 0.0,
        }
    }

    fn next_delta(&mut self) -> String {
        self.latitude += 0.00001;
        self.longitude += 0.00002;
        self.phase += 0.2;

        let sog = 3.85 + self.phase.sin();
        let cog = 1.52 + self.phase.cos() * 0.1;
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        serde_json::json!({
            "context": self.context,
            "updates": [{
                "$source": "demo.generator",
                "timestamp": timestamp,
                "values": [
                    {
                        "path": "navigation.position",
                        "value": {"latitude": self.latitude, "longitude": self.longitude}
                    },
                    {"path": "navigation.speedOverGround", "value": sog},
                    {"path": "navigation.courseOverGroundTrue", "value": cog}
                ]
            }]
        })
        .to_string()
    }
}
