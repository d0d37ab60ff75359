use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::types::ids::PositionId;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

pub fn position_span(position_id: PositionId) -> Span {
    tracing::info_span!(
        "position",
        position_id = %position_id,
    )
}

pub fn keeper_tick_span(tick: u64) -> Span {
    tracing::info_span!(
        "keeper_tick",
        tick = tick,
    )
}
