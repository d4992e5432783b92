//! Biased matrix factorization with attribute terms, trained by SGD
//!
//! The predicted rating for a (user, item) pair is the sum of
//! `b + b_u + b_i + a_u . user_attr + a_i . item_attr + P_u . Q_i`,
//! each term independently switchable. Training walks the observations in input
//! order once per epoch and halves the learning rate whenever the loss stalls.

use crate::attributes::{AttributeMatrix, Attributes};
use crate::channels::{
    AttributeWeights, ChannelKind, Channels, GlobalBias, IdBias, LatentFactors, Sample, Step,
};
use crate::config::ModelConfig;
use crate::convergence::{ConvergenceMonitor, EpochOutcome};
use crate::error::{ModelError, Result, Side};
use crate::index::{IdentifierIndex, RawId};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, trace};

/// Progress is reported every this many epochs when `verbose` is set
const REPORT_EVERY: usize = 10;

/// One training sample addressed by dense indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub epochs_run: usize,
    /// Loss after the last completed epoch
    pub final_loss: f64,
    pub initial_learning_rate: f64,
    pub final_learning_rate: f64,
    /// Number of stalled epochs, each of which halved the learning rate
    pub halvings: usize,
    /// Training ended through the stall rule rather than the epoch cap
    pub stopped_early: bool,
}

/// Everything that exists only once the model has been fit
#[derive(Debug, Clone)]
struct Fitted<U, I> {
    user_index: IdentifierIndex<U>,
    item_index: IdentifierIndex<I>,
    observations: Vec<Observation>,
    user_attributes: Option<AttributeMatrix>,
    item_attributes: Option<AttributeMatrix>,
    channels: Channels,
    learning_rate: f64,
    summary: FitSummary,
}

impl<U, I> Fitted<U, I> {
    /// One pass of SGD over the observations in stored order
    fn run_epoch(&mut self, regularization: f64) {
        let step = Step {
            learning_rate: self.learning_rate,
            regularization,
        };

        for obs in &self.observations {
            let sample = observed_sample(
                obs,
                self.user_attributes.as_ref(),
                self.item_attributes.as_ref(),
            );
            self.channels.sgd_step(&sample, obs.rating, step);
        }
    }

    /// Square root of the summed squared residuals (not divided by the count)
    fn loss(&self) -> f64 {
        self.observations
            .iter()
            .map(|obs| {
                let sample = observed_sample(
                    obs,
                    self.user_attributes.as_ref(),
                    self.item_attributes.as_ref(),
                );
                let residual = obs.rating - self.channels.score(&sample);
                residual * residual
            })
            .fold(0.0, |acc: f64, x| acc + x)
            .sqrt()
    }
}

/// Rating predictor over raw user ids `U` and item ids `I`
///
/// A model starts unfit; `fit` trains it once and `predict`/`mse` are available
/// afterwards. Latent factors are drawn from a generator owned by the model, seeded
/// from `ModelConfig::random_seed` when set.
#[derive(Debug, Clone)]
pub struct FactorizationModel<U, I> {
    config: ModelConfig,
    rng: StdRng,
    fitted: Option<Fitted<U, I>>,
}

impl<U: RawId, I: RawId> FactorizationModel<U, I> {
    pub fn new(config: ModelConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rng,
            fitted: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Train on parallel sequences of user ids, item ids and ratings
    ///
    /// Attribute maps enable the matching attribute channel; passing `None` (or an empty
    /// map) leaves it disabled for the lifetime of the model. Observations are visited
    /// in input order and duplicate pairs count as separate samples.
    ///
    /// # Errors
    ///
    /// - `LengthMismatch` if the three sequences differ in length
    /// - `DimensionMismatch` if the vectors of an attribute map differ in length
    pub fn fit(
        &mut self,
        user_ids: &[U],
        item_ids: &[I],
        ratings: &[f64],
        user_attributes: Option<&Attributes<U>>,
        item_attributes: Option<&Attributes<I>>,
    ) -> Result<&mut Self> {
        ensure_len(user_ids.len(), item_ids.len())?;
        ensure_len(user_ids.len(), ratings.len())?;

        let mut user_index = IdentifierIndex::new();
        let mut item_index = IdentifierIndex::new();
        let users = user_index.fit_transform(user_ids);
        let items = item_index.fit_transform(item_ids);

        let observations: Vec<Observation> = users
            .into_iter()
            .zip(items)
            .zip(ratings)
            .map(|((user, item), &rating)| Observation { user, item, rating })
            .collect();

        let user_matrix = user_attributes
            .filter(|attrs| !attrs.is_empty())
            .map(|attrs| AttributeMatrix::from_map(Side::User, attrs, &user_index))
            .transpose()?;
        let item_matrix = item_attributes
            .filter(|attrs| !attrs.is_empty())
            .map(|attrs| AttributeMatrix::from_map(Side::Item, attrs, &item_index))
            .transpose()?;

        let (num_users, num_items) = (user_index.len(), item_index.len());
        let channels = Channels {
            global_bias: self.config.global_bias.then(|| GlobalBias {
                value: ratings.iter().fold(0.0, |acc: f64, &x| acc + x),
            }),
            id_bias: self
                .config
                .id_bias
                .then(|| IdBias::zeros(num_users, num_items)),
            user_attributes: user_matrix
                .as_ref()
                .map(|m| AttributeWeights::zeros(Side::User, m.dim())),
            item_attributes: item_matrix
                .as_ref()
                .map(|m| AttributeWeights::zeros(Side::Item, m.dim())),
            latent_factors: (self.config.n_latent_factor > 0).then(|| {
                LatentFactors::random(
                    num_users,
                    num_items,
                    self.config.n_latent_factor,
                    &mut self.rng,
                )
            }),
        };

        debug!(
            num_users,
            num_items,
            observations = observations.len(),
            channels = ?channels.kinds(),
            n_epochs = self.config.n_epochs,
            "Starting SGD training"
        );

        let mut fitted = Fitted {
            user_index,
            item_index,
            observations,
            user_attributes: user_matrix,
            item_attributes: item_matrix,
            channels,
            learning_rate: self.config.learning_rate,
            summary: FitSummary {
                epochs_run: 0,
                final_loss: f64::NAN,
                initial_learning_rate: self.config.learning_rate,
                final_learning_rate: self.config.learning_rate,
                halvings: 0,
                stopped_early: false,
            },
        };

        let mut monitor = ConvergenceMonitor::new();
        for epoch in 0..self.config.n_epochs {
            fitted.run_epoch(self.config.regularization_weight);

            let loss = fitted.loss();
            fitted.summary.epochs_run = epoch + 1;
            fitted.summary.final_loss = loss;

            if self.config.verbose && (epoch + 1) % REPORT_EVERY == 0 {
                info!(
                    epoch = epoch + 1,
                    loss,
                    learning_rate = fitted.learning_rate,
                    "Training progress"
                );
            } else {
                trace!(epoch = epoch + 1, loss, learning_rate = fitted.learning_rate);
            }

            let outcome = monitor.observe(loss);
            if outcome.halves_learning_rate() {
                fitted.learning_rate *= 0.5;
                debug!(
                    epoch = epoch + 1,
                    stalls = monitor.stalls(),
                    learning_rate = fitted.learning_rate,
                    "Loss stalled, halving learning rate"
                );
            }
            if outcome == EpochOutcome::Exhausted {
                fitted.summary.stopped_early = true;
                debug!(epoch = epoch + 1, "Stopping early");
                break;
            }
        }

        fitted.summary.final_learning_rate = fitted.learning_rate;
        fitted.summary.halvings = monitor.stalls();

        debug!(
            epochs_run = fitted.summary.epochs_run,
            final_loss = fitted.summary.final_loss,
            stopped_early = fitted.summary.stopped_early,
            "SGD training finished"
        );

        self.fitted = Some(fitted);
        Ok(self)
    }

    fn state(&self) -> Result<&Fitted<U, I>> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)
    }

    /// Predict ratings for parallel sequences of raw user and item ids
    ///
    /// Unknown ids are allowed; the bias and latent terms that need them are left out.
    /// Attributes resolve per pair as: vector in the call's map for that id, else the
    /// vector bound to that id at fit time, else none.
    ///
    /// # Errors
    ///
    /// - `NotFitted` before `fit`
    /// - `MissingAttributes` if the model was fit with attributes for a side and the
    ///   call passes no (or an empty) map for that side; the fit-time vectors are not
    ///   used as a silent substitute for the whole map
    /// - `DimensionMismatch` for an explicit vector of the wrong length
    /// - `LengthMismatch` if the id sequences differ in length
    pub fn predict(
        &self,
        user_ids: &[U],
        item_ids: &[I],
        user_attributes: Option<&Attributes<U>>,
        item_attributes: Option<&Attributes<I>>,
    ) -> Result<Vec<f64>> {
        let state = self.state()?;
        ensure_len(user_ids.len(), item_ids.len())?;

        let user_attributes = acknowledged(Side::User, &state.user_attributes, user_attributes)?;
        let item_attributes = acknowledged(Side::Item, &state.item_attributes, item_attributes)?;

        user_ids
            .iter()
            .zip(item_ids)
            .map(|(user_id, item_id)| {
                let user = state.user_index.get(user_id);
                let item = state.item_index.get(item_id);

                let sample = Sample {
                    user,
                    item,
                    user_attr: resolve_attr(
                        state.user_attributes.as_ref(),
                        user_attributes
                            .and_then(|attrs| attrs.get(user_id))
                            .map(Vec::as_slice),
                        user,
                    )?,
                    item_attr: resolve_attr(
                        state.item_attributes.as_ref(),
                        item_attributes
                            .and_then(|attrs| attrs.get(item_id))
                            .map(Vec::as_slice),
                        item,
                    )?,
                };
                Ok(state.channels.score(&sample))
            })
            .collect()
    }

    /// Score a pair addressed by dense indices, `None` standing for an unknown id
    ///
    /// Attribute vectors are used as given; a channel the model was not fit with
    /// ignores its vector.
    ///
    /// # Errors
    ///
    /// `NotFitted`, `IndexOutOfRange` for an index the model never assigned, or
    /// `DimensionMismatch` for an attribute vector of the wrong length.
    pub fn score_indexed(
        &self,
        user: Option<usize>,
        item: Option<usize>,
        user_attr: Option<&[f64]>,
        item_attr: Option<&[f64]>,
    ) -> Result<f64> {
        let state = self.state()?;
        ensure_index(Side::User, user, state.user_index.len())?;
        ensure_index(Side::Item, item, state.item_index.len())?;

        let sample = Sample {
            user,
            item,
            user_attr: resolve_attr(state.user_attributes.as_ref(), user_attr, None)?,
            item_attr: resolve_attr(state.item_attributes.as_ref(), item_attr, None)?,
        };
        Ok(state.channels.score(&sample))
    }

    /// In-sample loss: square root of the summed squared residuals
    ///
    /// Not a mean despite the name.
    pub fn mse(&self) -> Result<f64> {
        Ok(self.state()?.loss())
    }

    pub fn summary(&self) -> Option<&FitSummary> {
        self.fitted.as_ref().map(|f| &f.summary)
    }

    /// Learning rate after decay, `None` before `fit`
    pub fn learning_rate(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.learning_rate)
    }

    pub fn user_index(&self) -> Option<&IdentifierIndex<U>> {
        self.fitted.as_ref().map(|f| &f.user_index)
    }

    pub fn item_index(&self) -> Option<&IdentifierIndex<I>> {
        self.fitted.as_ref().map(|f| &f.item_index)
    }

    pub fn num_users(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.user_index.len())
    }

    pub fn num_items(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.item_index.len())
    }

    pub fn observations(&self) -> &[Observation] {
        self.fitted
            .as_ref()
            .map(|f| f.observations.as_slice())
            .unwrap_or_default()
    }

    /// Enabled channels in scoring order
    pub fn channels(&self) -> Vec<ChannelKind> {
        self.fitted
            .as_ref()
            .map_or_else(Vec::new, |f| f.channels.kinds())
    }

    pub fn user_attribute_matrix(&self) -> Option<&AttributeMatrix> {
        self.fitted.as_ref()?.user_attributes.as_ref()
    }

    pub fn item_attribute_matrix(&self) -> Option<&AttributeMatrix> {
        self.fitted.as_ref()?.item_attributes.as_ref()
    }

    pub fn global_bias(&self) -> Option<f64> {
        Some(self.fitted.as_ref()?.channels.global_bias.as_ref()?.value)
    }

    pub fn user_bias(&self) -> Option<ArrayView1<'_, f64>> {
        Some(self.fitted.as_ref()?.channels.id_bias.as_ref()?.user.view())
    }

    pub fn item_bias(&self) -> Option<ArrayView1<'_, f64>> {
        Some(self.fitted.as_ref()?.channels.id_bias.as_ref()?.item.view())
    }

    pub fn user_attribute_coefficients(&self) -> Option<ArrayView1<'_, f64>> {
        let weights = self.fitted.as_ref()?.channels.user_attributes.as_ref()?;
        Some(weights.coefficients.view())
    }

    pub fn item_attribute_coefficients(&self) -> Option<ArrayView1<'_, f64>> {
        let weights = self.fitted.as_ref()?.channels.item_attributes.as_ref()?;
        Some(weights.coefficients.view())
    }

    /// `P`, `[num_users x n_latent_factor]`
    pub fn user_factors(&self) -> Option<ArrayView2<'_, f64>> {
        Some(self.fitted.as_ref()?.channels.latent_factors.as_ref()?.user.view())
    }

    /// `Q`, `[num_items x n_latent_factor]`
    pub fn item_factors(&self) -> Option<ArrayView2<'_, f64>> {
        Some(self.fitted.as_ref()?.channels.latent_factors.as_ref()?.item.view())
    }
}

fn ensure_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ModelError::LengthMismatch { expected, actual });
    }
    Ok(())
}

fn ensure_index(side: Side, index: Option<usize>, len: usize) -> Result<()> {
    match index {
        Some(index) if index >= len => Err(ModelError::IndexOutOfRange { side, index, len }),
        _ => Ok(()),
    }
}

/// Enforce that a side fit with attributes receives an attribute map at predict time
fn acknowledged<'a, K>(
    side: Side,
    fitted: &Option<AttributeMatrix>,
    supplied: Option<&'a Attributes<K>>,
) -> Result<Option<&'a Attributes<K>>> {
    let supplied = supplied.filter(|attrs| !attrs.is_empty());
    if fitted.is_some() && supplied.is_none() {
        return Err(ModelError::MissingAttributes { side });
    }
    Ok(supplied)
}

/// Pick the attribute vector for one side of a pair
///
/// Disabled channel: nothing. Otherwise the explicit vector (length-checked), else the
/// fit-time row of a known index, else nothing.
fn resolve_attr<'a>(
    matrix: Option<&'a AttributeMatrix>,
    explicit: Option<&'a [f64]>,
    index: Option<usize>,
) -> Result<Option<ArrayView1<'a, f64>>> {
    let Some(matrix) = matrix else {
        return Ok(None);
    };

    match (explicit, index) {
        (Some(attr), _) => matrix.view(attr).map(Some),
        (None, Some(index)) => Ok(Some(matrix.row(index))),
        (None, None) => Ok(None),
    }
}

fn observed_sample<'a>(
    obs: &Observation,
    user_attributes: Option<&'a AttributeMatrix>,
    item_attributes: Option<&'a AttributeMatrix>,
) -> Sample<'a> {
    Sample {
        user: Some(obs.user),
        item: Some(obs.item),
        user_attr: user_attributes.map(|m| m.row(obs.user)),
        item_attr: item_attributes.map(|m| m.row(obs.item)),
    }
}
