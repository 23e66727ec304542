//! Small deterministic statistics helpers.

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1), deterministic.
pub fn stddev_sample(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

/// Root mean square of a set of errors.
pub fn rms(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt()
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.2e-9). `p` must lie in (0, 1).
pub fn inverse_normal_cdf(p: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    let x = if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    };
    Some(x)
}

/// One-sided z for a service level (probability of no stock-out).
pub fn service_level_z(service_level: f64) -> Option<f64> {
    inverse_normal_cdf(service_level)
}

/// Two-sided z for a confidence interval of the given coverage.
pub fn interval_z(confidence_level: f64) -> Option<f64> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return None;
    }
    inverse_normal_cdf(0.5 + confidence_level / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sample_stddev() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&xs);
        assert!((m - 5.0).abs() < 1e-12);
        assert!((stddev_sample(&xs, m) - 2.138_089_935).abs() < 1e-6);
        assert_eq!(stddev_sample(&[3.0], 3.0), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn service_level_quantiles_match_tables() {
        let z95 = service_level_z(0.95).unwrap();
        assert!((z95 - 1.644_853_6).abs() < 1e-6);
        let z99 = service_level_z(0.99).unwrap();
        assert!((z99 - 2.326_347_9).abs() < 1e-6);
        let z50 = service_level_z(0.5).unwrap();
        assert!(z50.abs() < 1e-12);
    }

    #[test]
    fn tails_are_symmetric() {
        let lo = inverse_normal_cdf(0.001).unwrap();
        let hi = inverse_normal_cdf(0.999).unwrap();
        assert!((lo + hi).abs() < 1e-8);
        assert!((hi - 3.090_232_3).abs() < 1e-6);
    }

    #[test]
    fn two_sided_95_is_1_96() {
        assert!((interval_z(0.95).unwrap() - 1.959_964).abs() < 1e-5);
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        assert!(inverse_normal_cdf(0.0).is_none());
        assert!(inverse_normal_cdf(1.0).is_none());
        assert!(inverse_normal_cdf(f64::NAN).is_none());
        assert!(interval_z(1.0).is_none());
    }
}
