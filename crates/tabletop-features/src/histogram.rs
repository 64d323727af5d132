use crate::FeatureError;

/// Compute the histogram of a sequence of values.
///
/// The range `[min, max]` is split into `num_bins` equal bins; the last bin also holds values
/// equal to `max`. Values outside the range (and NaNs) are ignored.
///
/// # Arguments
///
/// * `values` - The values to count.
/// * `num_bins` - The number of bins to use for the histogram.
/// * `range` - The `(min, max)` range covered by the bins.
///
/// # Errors
///
/// Returns an error if the number of bins is zero or the range is empty.
///
/// # Example
///
/// ```
/// use tabletop_features::histogram::compute_histogram;
///
/// let values = [0.0, 2.0, 4.0, 128.0, 255.0, 256.0];
/// let histogram = compute_histogram(values, 2, (0.0, 256.0)).unwrap();
/// assert_eq!(histogram, vec![3.0, 3.0]);
/// ```
pub fn compute_histogram<I>(
    values: I,
    num_bins: usize,
    range: (f64, f64),
) -> Result<Vec<f64>, FeatureError>
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = range;
    if num_bins == 0 || !(max > min) {
        return Err(FeatureError::InvalidHistogram { num_bins, min, max });
    }

    let scale = num_bins as f64 / (max - min);
    let mut histogram = vec![0.0; num_bins];
    for value in values {
        if !(value >= min && value <= max) {
            continue;
        }
        let bin = (((value - min) * scale).floor() as usize).min(num_bins - 1);
        histogram[bin] += 1.0;
    }

    Ok(histogram)
}

/// Scale a histogram in place so that its entries sum to one.
///
/// A histogram with no counts is left as all zeros.
pub fn normalize_histogram(histogram: &mut [f64]) {
    let total = histogram.iter().sum::<f64>();
    if total > 0.0 {
        histogram.iter_mut().for_each(|v| *v /= total);
    }
}
