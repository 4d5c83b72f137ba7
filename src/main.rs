extern crate log;
use anyhow::anyhow;
use clap::Parser;
use hydro_graph::geofile::gdal_geofile::{write_graph_to_geofile, GdalDriverType};
use hydro_graph::geofile::geojson::write_graph_to_geojson;
use hydro_graph::{convert_geofile, ConversionOptions};
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs::read_to_string, path::Path};

/// Convert point and line features into a directed coordinate graph.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,
}

#[derive(Deserialize, Debug)]
struct Config {
    /// Dataset to read, e.g. a File Geodatabase, GeoPackage or Shapefile.
    source_path: PathBuf,
    /// Layer (feature class) to read. Optional if the dataset has a single layer.
    #[serde(default)]
    layer_name: Option<String>,
    #[serde(flatten)]
    options: ConversionOptions,
    #[serde(default)]
    output_geojson_path: Option<PathBuf>,
    #[serde(default)]
    output_geopackage_path: Option<PathBuf>,
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    if !Path::new(&args.config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config_contents = read_to_string(args.config_filepath)?;
    let config: Config = serde_yaml::from_str(&config_contents)?;
    if config.output_geojson_path.is_none() && config.output_geopackage_path.is_none() {
        return Err(anyhow!(
            "Config needs at least one of output_geojson_path or output_geopackage_path"
        ));
    }
    log::debug!("{:?}", config);

    let graph = convert_geofile(
        &config.source_path,
        config.layer_name.as_deref(),
        &config.options,
    )?;

    if let Some(output_geojson_path) = &config.output_geojson_path {
        log::info!("Writing graph to GeoJSON to {:?}", output_geojson_path);
        write_graph_to_geojson(&graph, output_geojson_path)?;
    }
    if let Some(output_geopackage_path) = &config.output_geopackage_path {
        log::info!("Writing graph to GeoPackage to {:?}", output_geopackage_path);
        write_graph_to_geofile(
            &graph,
            output_geopackage_path,
            GdalDriverType::GeoPackage.name(),
        )?;
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
