//! Background nucleotide probabilities used for PWM generation and the
//! null score distribution.

use log::info;

use crate::constants::MIN_BKG_VALUE;
use crate::types::{Result, ScanError};

/// A 4-vector of A/C/G/T(U) probabilities summing to one.
///
/// Values below [`MIN_BKG_VALUE`] are lifted before normalization so the
/// integer score range (and with it the CDF size) stays bounded. Source
/// precedence is user override, then motif-file-supplied (MEME), then
/// uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background([f64; 4]);

impl Default for Background {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Background {
    pub fn uniform() -> Self {
        Background([0.25; 4])
    }

    /// Validate, clamp, and normalize raw probabilities.
    pub fn from_values(values: [f64; 4]) -> Result<Self> {
        let mut bkg = values;
        if bkg.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ScanError::Background(
                "probabilities must be non-negative numbers".into(),
            ));
        }
        let min = bkg.iter().copied().fold(f64::INFINITY, f64::min);
        if min < MIN_BKG_VALUE {
            info!(
                "detected background values smaller than allowed min, adjusting ({:.2e}<{:.2e})",
                min, MIN_BKG_VALUE
            );
            for v in &mut bkg {
                *v += MIN_BKG_VALUE;
            }
        }
        let sum: f64 = bkg.iter().sum();
        if (sum - 1.0).abs() > 0.001 {
            info!("background values don't add up to 1.0, adjusting (sum={sum:.3})");
        }
        for v in &mut bkg {
            *v /= sum;
        }
        Ok(Background(bkg))
    }

    /// Parse the comma-separated `-b "a,c,g,t"` argument.
    pub fn parse(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(',').collect();
        if fields.len() < 4 {
            return Err(ScanError::Background(format!(
                "too few background values provided (found {}, need 4)",
                fields.len()
            )));
        }
        if fields.len() > 4 {
            return Err(ScanError::Background(format!(
                "too many background values provided (found {}, need 4)",
                fields.len()
            )));
        }
        let mut values = [0.0; 4];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field.trim().parse::<f64>().map_err(|_| {
                ScanError::Background(format!("failed to parse value '{}'", field.trim()))
            })?;
        }
        Self::from_values(values)
    }

    #[inline]
    pub fn freq(&self, index: usize) -> f64 {
        self.0[index]
    }

    pub fn as_array(&self) -> [f64; 4] {
        self.0
    }
}
