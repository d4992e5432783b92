//! attrmf demo: trains on a tiny rating set with user and item attributes and
//! prints in-sample and out-of-sample predictions as JSON.
//!
//! Usage: `attrmf-demo [CONFIG_FILE]`
//!
//! Without a config file the demo settings apply, overridable through `ATTRMF_*`
//! environment variables. With one, the file is layered over the library defaults and
//! under the environment.

use anyhow::{Context, Result};
use attrmf_core::{init_logging, load_dotenv, ConfigLoader, LogConfig};
use attrmf_model::{Attributes, FactorizationModel, ModelConfig};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

fn demo_config() -> ModelConfig {
    ModelConfig {
        n_latent_factor: 2,
        learning_rate: 0.005,
        regularization_weight: 0.02,
        n_epochs: 10_000,
        verbose: true,
        ..ModelConfig::default()
    }
}

fn main() -> Result<()> {
    load_dotenv();
    init_logging(&LogConfig::from_env()?)?;

    let config = match std::env::args().nth(1) {
        Some(path) => ModelConfig::load(Some(Path::new(&path)))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ModelConfig::from_env_with(demo_config())?,
    };
    config.validate()?;

    let user_ids: [i64; 8] = [1, 1, 1, 1, 5, 5, 8, 8];
    let item_ids: [i64; 8] = [1, 2, 3, 4, 2, 4, 1, 2];
    let ratings = [5.0, 5.0, 4.0, 4.0, 3.0, 3.0, 2.0, 2.0];
    let user_attributes: Attributes<i64> = HashMap::from([
        (1, vec![0.0, 1.0, 1.0]),
        (5, vec![1.0, 1.0, 0.0]),
        (8, vec![0.0, 0.0, 1.0]),
    ]);
    // Item 99 never appears in the ratings; it only has attributes.
    let item_attributes: Attributes<i64> =
        HashMap::from([(1, vec![1.2, 2.3]), (99, vec![3.7, 1.1])]);

    info!(
        observations = ratings.len(),
        n_epochs = config.n_epochs,
        n_latent_factor = config.n_latent_factor,
        "Training demo model"
    );

    let mut model = FactorizationModel::new(config);
    model
        .fit(
            &user_ids,
            &item_ids,
            &ratings,
            Some(&user_attributes),
            Some(&item_attributes),
        )
        .context("Training failed")?;

    let in_sample = model.predict(
        &user_ids,
        &item_ids,
        Some(&user_attributes),
        Some(&item_attributes),
    )?;

    let out_users = [8, 8, 8];
    let out_items = [3, 4, 99];
    let out_of_sample = model.predict(
        &out_users,
        &out_items,
        Some(&user_attributes),
        Some(&item_attributes),
    )?;

    let report = serde_json::json!({
        "in_sample": {
            "user_ids": user_ids,
            "item_ids": item_ids,
            "ratings": ratings,
            "predictions": in_sample,
        },
        "out_of_sample": {
            "user_ids": out_users,
            "item_ids": out_items,
            "predictions": out_of_sample,
        },
        "loss": model.mse()?,
        "summary": model.summary(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
