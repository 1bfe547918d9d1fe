use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use tableau::assets::AssetStore;
use tableau::config::{DebugHitboxes, EngineConfig, RenderPass};
use tableau::engine::SceneEngine;
use tableau::error::RenderError;
use tableau::geom::Point;
use tableau::painter::{AssetPainter, FillPainter, LocalPainter, PainterRegistry};
use tableau::scene::{ObjectKind, Panel};
use tableau::selection::Selection;
use tableau::surface::{Color, Raster};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read scene file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scene JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("cannot allocate surface: {0}")]
    Surface(#[from] RenderError),
}

#[derive(Parser, Debug)]
#[command(name = "tableau", about = "Render and hit-test scene panel snapshots")]
struct Cli {
    #[arg(long, env = "TABLEAU_SCREEN_WIDTH")]
    screen_width: Option<u32>,

    #[arg(long, env = "TABLEAU_SCREEN_HEIGHT")]
    screen_height: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one frame of a panel snapshot and probe points against it.
    Probe {
        /// JSON file with `panel` and optional `selection`.
        scene: PathBuf,

        /// Hit-test probe as `X,Y`. Repeatable.
        #[arg(long = "point", value_parser = parse_point)]
        points: Vec<Point>,

        /// Render with high-quality assets and no selection output.
        #[arg(long)]
        export: bool,

        /// Paint hitboxes: none, selected or all.
        #[arg(long, env = "TABLEAU_DEBUG_HITBOXES", default_value = "none")]
        debug_hitboxes: DebugHitboxes,
    },
}

#[derive(Debug, Deserialize)]
struct SceneFile {
    panel: Panel,
    #[serde(default)]
    selection: Selection,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok(Point::new(x, y))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = EngineConfig::from_env();
    if let Some(width) = cli.screen_width {
        config.screen_width = width;
    }
    if let Some(height) = cli.screen_height {
        config.screen_height = height;
    }

    match cli.command {
        Command::Probe { scene, points, export, debug_hitboxes } => {
            config.debug_hitboxes = debug_hitboxes;
            let pass = if export { RenderPass::export() } else { config.preview_pass() };
            run_probe(config, &scene, &points, pass).await
        }
    }
}

async fn run_probe(config: EngineConfig, scene: &Path, points: &[Point], pass: RenderPass) -> Result<(), CliError> {
    let text = tokio::fs::read_to_string(scene).await?;
    let SceneFile { panel, selection } = serde_json::from_str(&text)?;
    info!(objects = panel.len(), path = %scene.display(), "scene loaded");

    let mut screen = Raster::allocate(config.screen_width, config.screen_height, config.max_surface_side)?;

    let mut engine = SceneEngine::new(config, probe_painters()?);
    let report = engine.render_frame(&panel, &mut screen, &pass, &selection).await;

    let hits: Vec<_> = points
        .iter()
        .map(|p| json!({ "x": p.x, "y": p.y, "id": engine.hit_test(&panel, *p) }))
        .collect();
    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|(id, err)| json!({ "id": id, "error": err.to_string() }))
        .collect();
    let output = json!({
        "drawn": report.drawn(),
        "refreshed": report.refreshed,
        "reused": report.reused,
        "direct": report.direct,
        "empty": report.empty,
        "unpainted": report.unpainted,
        "failed": failed,
        "hits": hits,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    engine.teardown();
    Ok(())
}

/// Stand-in painters: flat assets for backgrounds and characters, the error
/// placeholder for sprites, solid fills for the UI kinds.
fn probe_painters() -> Result<PainterRegistry, RenderError> {
    let mut store = AssetStore::new();
    store.register("background", Raster::filled(1, 1, Color::rgb(96, 96, 96))?);
    store.register_lq("background", Raster::filled(1, 1, Color::rgb(64, 64, 64))?);
    store.register("character", Raster::filled(1, 1, Color::rgb(230, 180, 150))?);
    let store = Arc::new(store);

    let asset = |key: &str| -> Arc<dyn LocalPainter> {
        Arc::new(AssetPainter { resolver: store.clone(), key: key.to_owned() })
    };
    let fill = |color: Color| -> Arc<dyn LocalPainter> { Arc::new(FillPainter { color }) };

    let mut registry = PainterRegistry::new();
    registry.register(ObjectKind::Background, asset("background"));
    registry.register(ObjectKind::Character, asset("character"));
    registry.register(ObjectKind::Sprite, asset("sprite"));
    registry.register(ObjectKind::TextBox, fill(Color::WHITE));
    registry.register(ObjectKind::Choice, fill(Color::rgb(255, 189, 225)));
    registry.register(ObjectKind::Notification, fill(Color::rgb(255, 230, 244)));
    registry.register(ObjectKind::Poem, fill(Color::rgb(245, 240, 225)));
    Ok(registry)
}
