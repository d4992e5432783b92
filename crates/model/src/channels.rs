//! Additive prediction channels
//!
//! A rating prediction is the sum of independent contributions: global bias, per-id
//! biases, user and item attribute terms, and the latent factor inner product. Each
//! contribution owns its parameters, knows how to score a sample and how to apply one
//! SGD step given the shared residual. Disabled channels are simply absent.

use crate::error::Side;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

/// Standard deviation of the latent factor initializer
pub const LATENT_INIT_STD: f64 = 0.1;

/// Everything a channel may need to score one (user, item) pair
///
/// `None` indices are unknown ids; channels that need them contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sample<'a> {
    pub user: Option<usize>,
    pub item: Option<usize>,
    pub user_attr: Option<ArrayView1<'a, f64>>,
    pub item_attr: Option<ArrayView1<'a, f64>>,
}

/// Optimizer hyperparameters for a single update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub learning_rate: f64,
    pub regularization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    GlobalBias,
    IdBias,
    UserAttributes,
    ItemAttributes,
    LatentFactors,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::GlobalBias => "global_bias",
            ChannelKind::IdBias => "id_bias",
            ChannelKind::UserAttributes => "user_attributes",
            ChannelKind::ItemAttributes => "item_attributes",
            ChannelKind::LatentFactors => "latent_factors",
        };
        f.write_str(name)
    }
}

/// One additive term of the prediction
pub trait Contribution: fmt::Debug + Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Contribution of this channel to the predicted rating
    fn score(&self, sample: &Sample<'_>) -> f64;

    /// Apply one SGD step for the residual `rating - prediction` of `sample`
    fn update(&mut self, sample: &Sample<'_>, residual: f64, step: Step);
}

/// Constant offset shared by all predictions
///
/// Initialized to the sum of the training ratings and never updated by SGD.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalBias {
    pub value: f64,
}

impl Contribution for GlobalBias {
    fn kind(&self) -> ChannelKind {
        ChannelKind::GlobalBias
    }

    fn score(&self, _sample: &Sample<'_>) -> f64 {
        self.value
    }

    fn update(&mut self, _sample: &Sample<'_>, _residual: f64, _step: Step) {}
}

/// Per-user and per-item scalar offsets
#[derive(Debug, Clone, PartialEq)]
pub struct IdBias {
    pub user: Array1<f64>,
    pub item: Array1<f64>,
}

impl IdBias {
    pub fn zeros(num_users: usize, num_items: usize) -> Self {
        Self {
            user: Array1::zeros(num_users),
            item: Array1::zeros(num_items),
        }
    }
}

impl Contribution for IdBias {
    fn kind(&self) -> ChannelKind {
        ChannelKind::IdBias
    }

    fn score(&self, sample: &Sample<'_>) -> f64 {
        let user = sample.user.map_or(0.0, |u| self.user[u]);
        let item = sample.item.map_or(0.0, |i| self.item[i]);
        user + item
    }

    fn update(&mut self, sample: &Sample<'_>, residual: f64, step: Step) {
        let Step {
            learning_rate: lr,
            regularization: reg,
        } = step;

        if let Some(u) = sample.user {
            self.user[u] += lr * (residual - reg * self.user[u]);
        }
        if let Some(i) = sample.item {
            self.item[i] += lr * (residual - reg * self.item[i]);
        }
    }
}

/// Linear weights over one side's attribute vector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeWeights {
    pub side: Side,
    pub coefficients: Array1<f64>,
}

impl AttributeWeights {
    pub fn zeros(side: Side, dim: usize) -> Self {
        Self {
            side,
            coefficients: Array1::zeros(dim),
        }
    }

    fn attr<'a>(&self, sample: &Sample<'a>) -> Option<ArrayView1<'a, f64>> {
        match self.side {
            Side::User => sample.user_attr,
            Side::Item => sample.item_attr,
        }
    }
}

impl Contribution for AttributeWeights {
    fn kind(&self) -> ChannelKind {
        match self.side {
            Side::User => ChannelKind::UserAttributes,
            Side::Item => ChannelKind::ItemAttributes,
        }
    }

    fn score(&self, sample: &Sample<'_>) -> f64 {
        self.attr(sample)
            .map_or(0.0, |attr| self.coefficients.dot(&attr))
    }

    /// `a += lr * attr * (e - reg * a)`, element-wise.
    ///
    /// The attribute value scales the regularization term as well as the residual.
    fn update(&mut self, sample: &Sample<'_>, residual: f64, step: Step) {
        let Some(attr) = self.attr(sample) else {
            return;
        };
        let Step {
            learning_rate: lr,
            regularization: reg,
        } = step;

        Zip::from(&mut self.coefficients)
            .and(&attr)
            .for_each(|a, &x| *a += lr * x * (residual - reg * *a));
    }
}

/// User and item latent factor matrices
#[derive(Debug, Clone, PartialEq)]
pub struct LatentFactors {
    /// `P`: [num_users x k]
    pub user: Array2<f64>,
    /// `Q`: [num_items x k]
    pub item: Array2<f64>,
}

impl LatentFactors {
    /// Draw both matrices from Normal(0, LATENT_INIT_STD), `P` first, row-major
    pub fn random<R: Rng>(num_users: usize, num_items: usize, k: usize, rng: &mut R) -> Self {
        let mut draw =
            |_: (usize, usize)| LATENT_INIT_STD * rng.sample::<f64, _>(StandardNormal);
        let user = Array2::from_shape_fn((num_users, k), &mut draw);
        let item = Array2::from_shape_fn((num_items, k), &mut draw);
        Self { user, item }
    }

    pub fn n_factors(&self) -> usize {
        self.user.ncols()
    }
}

impl Contribution for LatentFactors {
    fn kind(&self) -> ChannelKind {
        ChannelKind::LatentFactors
    }

    fn score(&self, sample: &Sample<'_>) -> f64 {
        match (sample.user, sample.item) {
            (Some(u), Some(i)) => self.user.row(u).dot(&self.item.row(i)),
            _ => 0.0,
        }
    }

    /// Both rows are stepped from their pre-update values.
    fn update(&mut self, sample: &Sample<'_>, residual: f64, step: Step) {
        let (Some(u), Some(i)) = (sample.user, sample.item) else {
            return;
        };
        let Step {
            learning_rate: lr,
            regularization: reg,
        } = step;

        let p_before = self.user.row(u).to_owned();

        Zip::from(self.user.row_mut(u))
            .and(self.item.row(i))
            .for_each(|p, &q| *p += lr * (residual * q - reg * *p));

        Zip::from(self.item.row_mut(i))
            .and(&p_before)
            .for_each(|q, &p| *q += lr * (residual * p - reg * *q));
    }
}

/// The ordered set of enabled channels of a model
#[derive(Debug, Clone, Default)]
pub struct Channels {
    pub global_bias: Option<GlobalBias>,
    pub id_bias: Option<IdBias>,
    pub user_attributes: Option<AttributeWeights>,
    pub item_attributes: Option<AttributeWeights>,
    pub latent_factors: Option<LatentFactors>,
}

impl Channels {
    /// Enabled channels in scoring order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Contribution> + '_ {
        [
            self.global_bias.as_ref().map(|c| c as &dyn Contribution),
            self.id_bias.as_ref().map(|c| c as &dyn Contribution),
            self.user_attributes.as_ref().map(|c| c as &dyn Contribution),
            self.item_attributes.as_ref().map(|c| c as &dyn Contribution),
            self.latent_factors.as_ref().map(|c| c as &dyn Contribution),
        ]
        .into_iter()
        .flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Contribution> + '_ {
        [
            self.global_bias.as_mut().map(|c| c as &mut dyn Contribution),
            self.id_bias.as_mut().map(|c| c as &mut dyn Contribution),
            self.user_attributes
                .as_mut()
                .map(|c| c as &mut dyn Contribution),
            self.item_attributes
                .as_mut()
                .map(|c| c as &mut dyn Contribution),
            self.latent_factors
                .as_mut()
                .map(|c| c as &mut dyn Contribution),
        ]
        .into_iter()
        .flatten()
    }

    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.iter().map(|c| c.kind()).collect()
    }

    pub fn score(&self, sample: &Sample<'_>) -> f64 {
        self.iter()
            .map(|c| c.score(sample))
            .fold(0.0, |acc, x| acc + x)
    }

    /// Score `sample`, then step every channel with the residual against `rating`
    ///
    /// Returns the residual computed before any parameter moved.
    pub fn sgd_step(&mut self, sample: &Sample<'_>, rating: f64, step: Step) -> f64 {
        let residual = rating - self.score(sample);
        for channel in self.iter_mut() {
            channel.update(sample, residual, step);
        }
        residual
    }
}
