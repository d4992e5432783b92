//! Side-information matrices for users and items

use crate::error::{ModelError, Result, Side};
use crate::index::{IdentifierIndex, RawId};
use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;

/// Attribute vectors keyed by raw user or item id
pub type Attributes<K> = HashMap<K, Vec<f64>>;

/// Dense `(num_entities, dim)` matrix whose row `k` holds the attributes of the entity
/// with dense index `k`
#[derive(Debug, Clone)]
pub struct AttributeMatrix {
    side: Side,
    values: Array2<f64>,
}

impl AttributeMatrix {
    /// Bind raw-keyed attributes to the dense indices of `index`
    ///
    /// The dimensionality is taken from the entry with the smallest key and every other
    /// vector must match it. Indexed entities without attributes keep a zero row;
    /// attribute entries for ids outside the index are dropped.
    pub fn from_map<K: RawId>(
        side: Side,
        attributes: &Attributes<K>,
        index: &IdentifierIndex<K>,
    ) -> Result<Self> {
        let dim = attributes
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, v)| v.len())
            .unwrap_or(0);

        let mut values = Array2::<f64>::zeros((index.len(), dim));

        for (id, attr) in attributes {
            ensure_dim(side, dim, attr.len())?;
            if let Some(row) = index.get(id) {
                values
                    .row_mut(row)
                    .assign(&ArrayView1::from(attr.as_slice()));
            }
        }

        Ok(Self { side, values })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Attribute dimensionality fixed at fit time
    pub fn dim(&self) -> usize {
        self.values.ncols()
    }

    pub fn num_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Borrow an externally supplied vector after checking its length
    pub fn view<'a>(&self, attr: &'a [f64]) -> Result<ArrayView1<'a, f64>> {
        ensure_dim(self.side, self.dim(), attr.len())?;
        Ok(ArrayView1::from(attr))
    }
}

fn ensure_dim(side: Side, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ModelError::DimensionMismatch {
            side,
            expected,
            actual,
        });
    }
    Ok(())
}
