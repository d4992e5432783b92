//! Training progress logging tests

use crate::{FactorizationModel, ModelConfig};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Per-epoch progress events as `(level, epoch)`
#[derive(Clone, Default)]
struct ProgressEvents(Arc<Mutex<Vec<(Level, u64)>>>);

impl ProgressEvents {
    fn epochs_at(&self, level: Level) -> Vec<u64> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, epoch)| *epoch)
            .collect()
    }
}

#[derive(Default)]
struct ProgressVisitor {
    epoch: Option<u64>,
    has_loss: bool,
    has_learning_rate: bool,
}

impl Visit for ProgressVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "epoch" {
            self.epoch = Some(value);
        }
    }

    fn record_f64(&mut self, field: &Field, _value: f64) {
        match field.name() {
            "loss" => self.has_loss = true,
            "learning_rate" => self.has_learning_rate = true,
            _ => {}
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
}

impl<S: Subscriber> Layer<S> for ProgressEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = ProgressVisitor::default();
        event.record(&mut visitor);

        if let (Some(epoch), true, true) =
            (visitor.epoch, visitor.has_loss, visitor.has_learning_rate)
        {
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), epoch));
        }
    }
}

fn fit_capturing(verbose: bool) -> ProgressEvents {
    let events = ProgressEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());

    let config = ModelConfig {
        n_latent_factor: 2,
        n_epochs: 25,
        verbose,
        random_seed: Some(21),
        ..ModelConfig::default()
    };
    let mut model = FactorizationModel::new(config);

    tracing::subscriber::with_default(subscriber, || {
        model
            .fit(
                &[1, 1, 1, 1, 5, 5, 8, 8],
                &[1, 2, 3, 4, 2, 4, 1, 2],
                &[5.0, 5.0, 4.0, 4.0, 3.0, 3.0, 2.0, 2.0],
                None,
                None,
            )
            .unwrap();
    });
    assert_eq!(model.summary().unwrap().epochs_run, 25);

    events
}

#[test]
fn test_verbose_reports_every_ten_epochs() {
    let events = fit_capturing(true);

    assert_eq!(events.epochs_at(Level::INFO), vec![10, 20]);
    assert_eq!(events.epochs_at(Level::TRACE).len(), 23);
}

#[test]
fn test_quiet_run_reports_at_trace_only() {
    let events = fit_capturing(false);

    assert!(events.epochs_at(Level::INFO).is_empty());
    let traced = events.epochs_at(Level::TRACE);
    assert_eq!(traced, (1..=25).collect::<Vec<u64>>());
}
