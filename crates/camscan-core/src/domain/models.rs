use serde::Serialize;

use crate::{UtcDateTime, ValidationError, YearMonth};

/// One monthly OHLC observation.
///
/// `ts` is the instant the provider stamped the bar with; `month` is the
/// calendar month that instant identifies once the exchange offset has been
/// applied, and is the only key the period selector looks at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub month: YearMonth,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl Bar {
    pub fn new(
        ts: UtcDateTime,
        month: YearMonth,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_finite("open", open)?;
        validate_finite("high", high)?;
        validate_finite("low", low)?;
        validate_finite("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            ts,
            month,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Build a bar from provider fields, reading a missing open, high or low
    /// as `0.0`. The `high >= low` check applies only when the payload
    /// supplied both.
    pub fn lenient(
        ts: UtcDateTime,
        month: YearMonth,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        if let (Some(high), Some(low)) = (high, low) {
            if high < low {
                return Err(ValidationError::InvalidBarRange);
            }
        }

        let field = |name: &'static str, value: Option<f64>| {
            let value = value.unwrap_or(0.0);
            validate_finite(name, value).map(|()| value)
        };
        validate_finite("close", close)?;

        Ok(Self {
            ts,
            month,
            open: field("open", open)?,
            high: field("high", high)?,
            low: field("low", low)?,
            close,
            volume,
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}
