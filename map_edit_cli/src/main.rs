use clap::{Parser, Subcommand};
use log::{debug, info};
use serde::Deserialize;
use std::io;

use map_edit::{
    feature::{AttributeValue, Feature, GEOMETRY_KEY},
    geometry::Point,
    io::{
        config::read_popup_options,
        geojson::{feature_from_json, read_features_geojson, write_change_set_geojson},
        read_to_string,
    },
    overlay::{Popup, PopupOptions},
    view::{Map, MapView, PixelRect, View},
    Transaction, VectorSource,
};

/// One step of an edit script. Features are referenced by index: loaded
/// features first, then added ones in the order they were added.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Edit {
    /// Add a GeoJSON Feature object.
    Add { feature: serde_json::Value },
    Set {
        feature: usize,
        key: String,
        value: AttributeValue,
    },
    Unset { feature: usize, key: String },
    Translate { feature: usize, dx: f64, dy: f64 },
    Remove { feature: usize },
}

fn parse_edits(path: &str) -> io::Result<Vec<Edit>> {
    let contents = read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn handle(handles: &[Feature], index: usize, step: usize) -> io::Result<&Feature> {
    handles.get(index).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("edit {}: no feature at index {}", step + 1, index),
        )
    })
}

fn apply_edits(
    source: &VectorSource,
    handles: &mut Vec<Feature>,
    edits: Vec<Edit>,
) -> io::Result<()> {
    for (step, edit) in edits.into_iter().enumerate() {
        debug!("edit {}: {:?}", step + 1, edit);
        match edit {
            Edit::Add { feature } => {
                let f = feature_from_json(feature)?;
                handles.push(f.clone());
                source.add_feature(f);
            }
            Edit::Set {
                feature,
                key,
                value,
            } => handle(handles, feature, step)?.set(key, value),
            Edit::Unset { feature, key } => {
                handle(handles, feature, step)?.unset(&key);
            }
            Edit::Translate { feature, dx, dy } => {
                let f = handle(handles, feature, step)?;
                if !f.update_geometry(GEOMETRY_KEY, |g| g.translate(dx, dy)) {
                    eprintln!("edit {}: feature {} has no geometry", step + 1, feature);
                }
            }
            Edit::Remove { feature } => {
                let f = handle(handles, feature, step)?.clone();
                source.remove_feature(&f);
            }
        }
    }
    Ok(())
}

fn replay(input: &str, edits: &str, rollback: bool, output: Option<&str>) -> io::Result<()> {
    let features = read_features_geojson(input)?;
    let mut handles = features.clone();
    let source = VectorSource::with_features(features);
    println!("Loaded {} features", source.len());

    let mut tx = Transaction::new();
    tx.attach(Some(&source));
    apply_edits(&source, &mut handles, parse_edits(edits)?)?;

    println!("Inserts: {}", tx.inserts().len());
    println!("Updates: {}", tx.updates().len());
    println!("Deletes: {}", tx.deletes().len());

    if let Some(path) = output {
        write_change_set_geojson(path, &tx.change_set())?;
        println!("Wrote {}", path);
    }

    if rollback {
        tx.rollback();
        println!("Rolled back; source has {} features", source.len());
    } else {
        let changes = tx.commit();
        info!("committed {} changes", changes.len());
        println!("Committed {} changes", changes.len());
    }
    Ok(())
}

/// Command line front end for the feature edit tracker and popup overlay.
#[derive(Parser)]
#[command(name = "map_edit_cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON edit script to GeoJSON features and report the changes.
    Replay {
        input: String,
        edits: String,
        /// Roll the edits back instead of committing them.
        #[arg(long)]
        rollback: bool,
        /// Write the change set as GeoJSON.
        #[arg(long)]
        output: Option<String>,
    },
    /// Show a popup on a headless map and print the panned center.
    PopupPan {
        #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], default_values_t = [800.0, 600.0])]
        viewport: Vec<f64>,
        #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [0.0, 0.0], allow_negative_numbers = true)]
        center: Vec<f64>,
        #[arg(long, default_value_t = 1.0)]
        resolution: f64,
        #[arg(long, num_args = 2, value_names = ["X", "Y"], required = true, allow_negative_numbers = true)]
        coord: Vec<f64>,
        /// Rendered popup size in pixels.
        #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], default_values_t = [200.0, 100.0])]
        size: Vec<f64>,
        /// JSON file with popup options.
        #[arg(long)]
        config: Option<String>,
    },
}

fn popup_pan(
    viewport: &[f64],
    center: &[f64],
    resolution: f64,
    coord: &[f64],
    size: &[f64],
    config: Option<&str>,
) -> io::Result<()> {
    let options = match config {
        Some(path) => read_popup_options(path)?,
        None => PopupOptions::default(),
    };
    let mut map = Map::new(
        PixelRect::new(0.0, 0.0, viewport[0], viewport[1]),
        View::new(Point::new(center[0], center[1]), resolution),
    );
    let mut popup = Popup::new(options);
    popup.set_size(size[0], size[1]);
    popup.show(&mut map, Point::new(coord[0], coord[1]), "");
    let center = map.center();
    println!("Center: {:.3},{:.3}", center.x, center.y);
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env().init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            input,
            edits,
            rollback,
            output,
        } => {
            if let Err(e) = replay(&input, &edits, rollback, output.as_deref()) {
                eprintln!("Error replaying {} on {}: {}", edits, input, e);
                std::process::exit(1);
            }
        }
        Commands::PopupPan {
            viewport,
            center,
            resolution,
            coord,
            size,
            config,
        } => {
            let result = popup_pan(
                &viewport,
                &center,
                resolution,
                &coord,
                &size,
                config.as_deref(),
            );
            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
