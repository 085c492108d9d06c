use super::sweep_orchestrator::SweepError;
use serde::{Deserialize, Deserializer, Serialize};

/// default bound on the number of values of one axis and on the cells of one sweep
pub const DEFAULT_MAX_CELLS: usize = 1_000_000;

/// Values of one axis of the sweep: either an explicit list or a half-open range
/// `start, start + step, ... < stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisRange {
    Values(Vec<f64>),
    Range { start: f64, stop: f64, step: f64 },
}

impl Default for AxisRange {
    /// 0.5, 1.0, ... 10.0
    fn default() -> Self {
        AxisRange::Range {
            start: 0.5,
            stop: 10.5,
            step: 0.5,
        }
    }
}

impl AxisRange {
    /// Ordered axis values. They must be finite, non-negative and strictly increasing.
    pub fn values(&self) -> Result<Vec<f64>, SweepError> {
        self.values_within(DEFAULT_MAX_CELLS)
    }

    /// Same as [`AxisRange::values`], with at most `max_values` values. The count of a range
    /// is checked before anything is allocated.
    pub fn values_within(&self, max_values: usize) -> Result<Vec<f64>, SweepError> {
        let too_many = |count: f64| {
            SweepError::InvalidAxis(format!(
                "axis has {} values, at most {} are allowed",
                count, max_values
            ))
        };
        let values = match self {
            AxisRange::Values(values) => {
                if values.len() > max_values {
                    return Err(too_many(values.len() as f64));
                }
                values.clone()
            }
            AxisRange::Range { start, stop, step } => {
                if !(start.is_finite() && stop.is_finite() && step.is_finite() && *step > 0.0) {
                    return Err(SweepError::InvalidAxis(format!(
                        "range {}..{} with step {} is not valid",
                        start, stop, step
                    )));
                }
                // the small shift keeps `stop` itself out of the half-open range
                let count = ((stop - start) / step - 1e-9).ceil().max(0.0);
                if !(count <= max_values as f64) {
                    return Err(too_many(count));
                }
                let count = count as usize;
                (0..count).map(|i| start + i as f64 * step).collect()
            }
        };
        if values.is_empty() {
            return Err(SweepError::InvalidAxis("axis has no values".to_string()));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(SweepError::InvalidAxis(format!(
                "axis value {} is not a valid concentration",
                bad
            )));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SweepError::InvalidAxis(
                "axis values must be strictly increasing".to_string(),
            ));
        }
        Ok(values)
    }
}

/// Heatmap data: z[i][j] is the value at (y[i], x[j])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// failed cells are NaN, written as null
    #[serde(deserialize_with = "deserialize_cells")]
    pub z: Vec<Vec<f64>>,
}

// null -> NaN, the inverse of what serde_json writes for a NaN
fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows: Vec<Vec<Option<f64>>> = Vec::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        .collect())
}

impl Grid {
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// CSV with the column axis in the header and one line per row value; failed cells stay empty
    pub fn to_csv(&self, row_label: &str, column_label: &str) -> String {
        let mut csv = format!("{}\\{}", row_label, column_label);
        for x in self.x.iter() {
            csv.push_str(&format!(",{}", x));
        }
        csv.push('\n');
        for (y, row) in self.y.iter().zip(self.z.iter()) {
            csv.push_str(&y.to_string());
            for value in row.iter() {
                if value.is_nan() {
                    csv.push(',');
                } else {
                    csv.push_str(&format!(",{}", value));
                }
            }
            csv.push('\n');
        }
        csv
    }
}
