//! End-to-end training and prediction through the public API

use anyhow::Result;
use attrmf_model::{Attributes, ChannelKind, FactorizationModel, ModelConfig};
use std::collections::HashMap;
use uuid::Uuid;

const USERS: [i64; 8] = [1, 1, 1, 1, 5, 5, 8, 8];
const ITEMS: [i64; 8] = [1, 2, 3, 4, 2, 4, 1, 2];
const RATINGS: [f64; 8] = [5.0, 5.0, 4.0, 4.0, 3.0, 3.0, 2.0, 2.0];

fn user_attributes() -> Attributes<i64> {
    HashMap::from([
        (1, vec![0.0, 1.0, 1.0]),
        (5, vec![1.0, 1.0, 0.0]),
        (8, vec![0.0, 0.0, 1.0]),
    ])
}

fn item_attributes() -> Attributes<i64> {
    HashMap::from([(1, vec![1.2, 2.3]), (99, vec![3.7, 1.1])])
}

fn demo_config(seed: u64) -> ModelConfig {
    ModelConfig {
        n_latent_factor: 2,
        learning_rate: 0.005,
        regularization_weight: 0.02,
        n_epochs: 10_000,
        random_seed: Some(seed),
        ..ModelConfig::default()
    }
}

fn trained(seed: u64) -> Result<FactorizationModel<i64, i64>> {
    let mut model = FactorizationModel::new(demo_config(seed));
    model.fit(
        &USERS,
        &ITEMS,
        &RATINGS,
        Some(&user_attributes()),
        Some(&item_attributes()),
    )?;
    Ok(model)
}

#[test]
fn test_fits_training_ratings() -> Result<()> {
    let model = trained(2024)?;

    assert_eq!(
        model.channels(),
        vec![
            ChannelKind::GlobalBias,
            ChannelKind::IdBias,
            ChannelKind::UserAttributes,
            ChannelKind::ItemAttributes,
            ChannelKind::LatentFactors,
        ]
    );
    assert!(model.mse()? < 0.25);

    let predictions = model.predict(
        &USERS,
        &ITEMS,
        Some(&user_attributes()),
        Some(&item_attributes()),
    )?;
    for (prediction, rating) in predictions.iter().zip(RATINGS) {
        assert!(
            (prediction - rating).abs() < 0.15,
            "predicted {prediction}, expected {rating}"
        );
    }

    Ok(())
}

#[test]
fn test_out_of_sample_predictions_are_finite() -> Result<()> {
    let model = trained(7)?;

    let predictions = model.predict(
        &[8, 8, 8],
        &[3, 4, 99],
        Some(&user_attributes()),
        Some(&item_attributes()),
    )?;
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| p.is_finite()));

    // Item 99 was never rated; only its attribute vector and user 8's terms apply.
    let without_item = model.score_indexed(Some(2), None, Some(&[0.0, 0.0, 1.0][..]), None)?;
    let coefficients = model.item_attribute_coefficients().unwrap();
    let item_term = coefficients[0] * 3.7 + coefficients[1] * 1.1;
    assert!((predictions[2] - (without_item + item_term)).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_summary_reports_training_run() -> Result<()> {
    let model = trained(11)?;
    let summary = model.summary().unwrap();

    assert!(summary.epochs_run > 0 && summary.epochs_run <= 10_000);
    assert_eq!(summary.initial_learning_rate, 0.005);
    let expected_rate = 0.005 / 2f64.powi(summary.halvings as i32);
    assert!((summary.final_learning_rate - expected_rate).abs() < 1e-15);
    if summary.stopped_early {
        assert_eq!(summary.halvings, 11);
    }
    assert_eq!(summary.final_loss, model.mse()?);

    let json = serde_json::to_value(summary)?;
    assert_eq!(json["epochs_run"], summary.epochs_run);
    assert_eq!(json["stopped_early"], summary.stopped_early);

    Ok(())
}

#[test]
fn test_works_with_opaque_ids() -> Result<()> {
    let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let items = vec!["drama".to_string(), "comedy".to_string()];

    let user_ids = [users[0], users[0], users[1], users[2]];
    let item_ids = [
        items[0].clone(),
        items[1].clone(),
        items[0].clone(),
        items[1].clone(),
    ];
    let ratings = [4.0, 1.0, 5.0, 2.0];

    let config = ModelConfig {
        n_latent_factor: 4,
        n_epochs: 200,
        random_seed: Some(3),
        ..ModelConfig::default()
    };
    let mut model = FactorizationModel::new(config);
    model.fit(&user_ids, &item_ids, &ratings, None, None)?;

    assert_eq!(model.num_users(), 3);
    assert_eq!(model.num_items(), 2);

    let predictions = model.predict(
        &[users[1], Uuid::new_v4()],
        &["comedy".to_string(), "horror".to_string()],
        None,
        None,
    )?;
    assert!(predictions.iter().all(|p| p.is_finite()));
    assert_eq!(predictions[1], model.global_bias().unwrap());

    Ok(())
}
