//! The five representation-test variants.
//!
//! Each is a pure function over two count vectors. Dispatch is a
//! tagged variant (`TestKind`), mirroring `StatisticalTest` /
//! `calculate_p_value` in the enrichment-analysis module this crate
//! is descended from, generalized from two cases to five. Exact
//! numeric semantics (equal-vectors shortcut, NaN fallback,
//! `min_proteomes` gating) follow the original source implementation.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::config::TestKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub p_value: f64,
    pub log2_mean: f64,
    pub mean_inside: f64,
    pub mean_outside: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Representation {
    Enriched,
    Depleted,
    Equal,
}

impl TestResult {
    pub fn representation(&self) -> Representation {
        if self.log2_mean > 0.0 {
            Representation::Enriched
        } else if self.log2_mean < 0.0 {
            Representation::Depleted
        } else {
            Representation::Equal
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn variance(values: &[f64], sample: bool) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let m = mean(values);
    let ssd: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    let denom = if sample { (n - 1).max(1) } else { n };
    ssd / denom as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    let mid = (n - 1) / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid] + sorted[mid + 1]) / 2.0
    }
}

/// Top-level entry point: filters to strictly-positive counts, applies
/// the `min_proteomes` gate, then dispatches to `test`.
///
/// Returns `None` on statistical degeneracy.
pub fn representation_test(
    inside: &[u32],
    outside: &[u32],
    test: TestKind,
    min_proteomes: usize,
) -> Option<TestResult> {
    let a: Vec<f64> = inside.iter().filter(|&&c| c > 0).map(|&c| c as f64).collect();
    let b: Vec<f64> = outside.iter().filter(|&&c| c > 0).map(|&c| c as f64).collect();

    if a.len() < min_proteomes || b.len() < min_proteomes {
        return None;
    }

    let mean_a = mean(&a);
    let mean_b = mean(&b);
    let log2_mean = (mean_a / mean_b).log2();

    let unique_a: std::collections::HashSet<u64> =
        a.iter().map(|v| v.to_bits()).collect();
    let unique_b: std::collections::HashSet<u64> =
        b.iter().map(|v| v.to_bits()).collect();

    let p_value = if unique_a.len() == 1 && unique_b.len() == 1 && unique_a == unique_b {
        1.0
    } else {
        let p = match test {
            TestKind::Mannwhitneyu => mann_whitney_u(&a, &b),
            TestKind::Welch => welch_t_test(&a, &b),
            TestKind::Ttest => students_t_test(&a, &b),
            TestKind::Ks => kolmogorov_smirnov(&a, &b),
            TestKind::Kruskal => kruskal_wallis(&a, &b),
        };
        if p.is_nan() {
            1.0
        } else {
            p
        }
    };

    Some(TestResult {
        p_value,
        log2_mean,
        mean_inside: mean_a,
        mean_outside: mean_b,
    })
}

/// Average ranks across the pooled sample, returning (ranks_a, ranks_b,
/// tie-correction term `sum(t^3 - t)`).
fn rank_pooled(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
    let n1 = a.len();
    let mut combined: Vec<(f64, usize)> = a
        .iter()
        .chain(b.iter())
        .cloned()
        .enumerate()
        .map(|(i, v)| (v, i))
        .collect();
    combined.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap());

    let n = combined.len();
    let mut ranks = vec![0.0; n];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && combined[j + 1].0 == combined[i].0 {
            j += 1;
        }
        let avg_rank = (i + 1 + j + 1) as f64 / 2.0;
        let t = (j - i + 1) as f64;
        tie_term += t.powi(3) - t;
        for k in i..=j {
            ranks[combined[k].1] = avg_rank;
        }
        i = j + 1;
    }

    let ranks_a = ranks[..n1].to_vec();
    let ranks_b = ranks[n1..].to_vec();
    (ranks_a, ranks_b, tie_term)
}

pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> f64 {
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    if n1 == 0.0 || n2 == 0.0 {
        return 1.0;
    }
    let (ranks_a, _, tie_term) = rank_pooled(a, b);
    let rank_sum_a: f64 = ranks_a.iter().sum();
    let u1 = rank_sum_a - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let u = u1.min(u2);

    let n = n1 + n2;
    let mu = n1 * n2 / 2.0;
    let sigma_sq = (n1 * n2 / 12.0) * ((n + 1.0) - tie_term / (n * (n - 1.0)).max(1e-12));
    if sigma_sq <= 0.0 {
        return 1.0;
    }
    let sigma = sigma_sq.sqrt();
    let z = ((u - mu).abs() - 0.5).max(0.0) / sigma;
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p = 2.0 * (1.0 - normal.cdf(z));
    p.min(1.0)
}

pub fn kruskal_wallis(a: &[f64], b: &[f64]) -> f64 {
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let n = n1 + n2;
    if n < 2.0 {
        return 1.0;
    }
    let (ranks_a, ranks_b, tie_term) = rank_pooled(a, b);
    let rank_sum_a: f64 = ranks_a.iter().sum();
    let rank_sum_b: f64 = ranks_b.iter().sum();

    let h = (12.0 / (n * (n + 1.0))) * (rank_sum_a.powi(2) / n1 + rank_sum_b.powi(2) / n2)
        - 3.0 * (n + 1.0);
    let c = 1.0 - tie_term / (n.powi(3) - n).max(1e-12);
    if c <= 0.0 {
        return 1.0;
    }
    let h_corrected = h / c;

    let chi2 = statrs::distribution::ChiSquared::new(1.0).unwrap();
    (1.0 - chi2.cdf(h_corrected.max(0.0))).clamp(0.0, 1.0)
}

pub fn kolmogorov_smirnov(a: &[f64], b: &[f64]) -> f64 {
    let mut sa = a.to_vec();
    let mut sb = b.to_vec();
    sa.sort_by(|x, y| x.partial_cmp(y).unwrap());
    sb.sort_by(|x, y| x.partial_cmp(y).unwrap());

    let n1 = sa.len() as f64;
    let n2 = sb.len() as f64;

    let mut points: Vec<f64> = sa.iter().chain(sb.iter()).cloned().collect();
    points.sort_by(|x, y| x.partial_cmp(y).unwrap());
    points.dedup();

    let mut d_max = 0.0_f64;
    for &x in &points {
        let cdf_a = sa.iter().filter(|&&v| v <= x).count() as f64 / n1;
        let cdf_b = sb.iter().filter(|&&v| v <= x).count() as f64 / n2;
        d_max = d_max.max((cdf_a - cdf_b).abs());
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    kolmogorov_sf((en + 0.12 + 0.11 / en) * d_max)
}

/// Asymptotic Kolmogorov distribution survival function.
fn kolmogorov_sf(x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100 {
        let term = (-1.0_f64).powi(k - 1) * (-2.0 * (k as f64).powi(2) * x * x).exp();
        sum += term;
        if term.abs() < 1e-10 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

pub fn welch_t_test(a: &[f64], b: &[f64]) -> f64 {
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let v1 = variance(a, true);
    let v2 = variance(b, true);
    let se2 = v1 / n1 + v2 / n2;
    if se2 <= 0.0 {
        return 1.0;
    }
    let t = (mean(a) - mean(b)) / se2.sqrt();
    let df = se2.powi(2)
        / ((v1 / n1).powi(2) / (n1 - 1.0).max(1.0) + (v2 / n2).powi(2) / (n2 - 1.0).max(1.0));
    let dist = StudentsT::new(0.0, 1.0, df.max(1.0)).unwrap();
    (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)
}

pub fn students_t_test(a: &[f64], b: &[f64]) -> f64 {
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let v1 = variance(a, true);
    let v2 = variance(b, true);
    let df = n1 + n2 - 2.0;
    if df <= 0.0 {
        return 1.0;
    }
    let pooled_var = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    let se = (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se <= 0.0 {
        return 1.0;
    }
    let t = (mean(a) - mean(b)) / se;
    let dist = StudentsT::new(0.0, 1.0, df).unwrap();
    (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)
}

/// Applies the `1/(n+1)` smoothing of exact-zero p-values used solely
/// by the plot code path — never by tabular writers.
pub fn smooth_zero_pvalues(values: &mut [f64]) {
    let n = values.len();
    for v in values.iter_mut() {
        if *v == 0.0 {
            *v = 0.01 / (n as f64 + 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_constant_vectors_shortcut_to_one() {
        let r = representation_test(&[2, 2, 2], &[2, 2, 2], TestKind::Mannwhitneyu, 2).unwrap();
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.log2_mean, 0.0);
    }

    #[test]
    fn below_min_proteomes_is_none() {
        assert!(representation_test(&[1], &[1, 2], TestKind::Mannwhitneyu, 2).is_none());
    }

    #[test]
    fn enriched_scenario_from_spec() {
        // OG3 scenario: inside=[3,2] outside=[1,1]
        let r = representation_test(&[3, 2], &[1, 1], TestKind::Mannwhitneyu, 2).unwrap();
        assert!(r.log2_mean > 0.0);
        assert_eq!(r.representation(), Representation::Enriched);
        let expected = (2.5_f64 / 1.0).log2();
        assert!((r.log2_mean - expected).abs() < 1e-9);
    }

    #[test]
    fn depleted_is_inverse_of_enriched() {
        let inside = representation_test(&[3, 2], &[1, 1], TestKind::Mannwhitneyu, 2).unwrap();
        let outside = representation_test(&[1, 1], &[3, 2], TestKind::Mannwhitneyu, 2).unwrap();
        assert!((inside.log2_mean + outside.log2_mean).abs() < 1e-9);
        assert_eq!(outside.representation(), Representation::Depleted);
    }

    #[test]
    fn smoothing_only_touches_zeros() {
        let mut v = vec![0.0, 0.5, 0.0];
        smooth_zero_pvalues(&mut v);
        assert!(v[0] > 0.0 && v[0] < 0.01);
        assert_eq!(v[1], 0.5);
    }

    #[test]
    fn welch_on_clearly_different_samples_is_significant() {
        let a = vec![10.0, 11.0, 9.0, 10.0, 12.0];
        let b = vec![1.0, 2.0, 0.0, 1.0, 3.0];
        let p = welch_t_test(&a, &b);
        assert!(p < 0.05);
    }
}
