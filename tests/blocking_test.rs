use qmc_trace::{block_analysis, block_analysis_ratio, AnalysisError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Number of block sizes the analysis should emit for a series of
/// length n: powers of two no longer than n that leave more than
/// ddof whole blocks after the leading remainder is discarded.
fn expected_entries(n: usize, ddof: usize) -> usize {
    let mut count = 0;
    let mut block_size = 1;
    while block_size <= n {
        let num_blocks = (n - n % block_size) / block_size;
        if num_blocks > ddof {
            count += 1;
        }
        block_size <<= 1;
    }
    count
}

#[test]
fn test_result_length_matches_partition_rule() {
    let mut rng = SmallRng::seed_from_u64(7);
    for &n in &[1usize, 2, 3, 5, 16, 100, 255, 1000] {
        let data: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
        for ddof in [0usize, 1, 2] {
            let result = block_analysis(&data, ddof).unwrap();
            assert_eq!(
                result.len(),
                expected_entries(n, ddof),
                "wrong entry count for n = {n}, ddof = {ddof}"
            );
        }
    }
}

#[test]
fn test_block_sizes_are_increasing_powers_of_two() {
    let data: Vec<f64> = (0..500).map(|i| (i as f64).sin()).collect();
    let result = block_analysis(&data, 1).unwrap();
    for (i, entry) in result.iter().enumerate() {
        assert_eq!(entry.block_size, 1 << i);
    }
}

#[test]
fn test_constant_series_has_zero_error_everywhere() {
    let data = vec![3.25; 437];
    let result = block_analysis(&data, 1).unwrap();
    assert!(!result.is_empty());
    for entry in &result {
        assert_eq!(
            entry.std_err, 0.0,
            "constant data must have zero error at block size {}",
            entry.block_size
        );
    }
}

#[test]
fn test_leading_remainder_is_discarded() {
    // 10 samples, block size 4: the first two samples are dropped, so
    // the block means are mean(2..6) and mean(6..10). An outlier in
    // the leading remainder must not affect the size-4 entry.
    let mut data: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let baseline = block_analysis(&data, 1).unwrap();
    data[0] = 1e6;
    let spiked = block_analysis(&data, 1).unwrap();
    assert_eq!(baseline[2].std_err, spiked[2].std_err);
    assert_ne!(baseline[0].std_err, spiked[0].std_err);
}

#[test]
fn test_ratio_of_series_with_itself_vanishes() {
    let mut rng = SmallRng::seed_from_u64(21);
    let x: Vec<f64> = (0..512).map(|_| 1.0 + rng.gen::<f64>()).collect();
    let result = block_analysis_ratio(&x, &x, 1).unwrap();
    assert!(!result.is_empty());
    for entry in &result {
        assert!(
            entry.std_err.abs() < 1e-8,
            "covariance term must cancel for X/X, got {} at block size {}",
            entry.std_err,
            entry.block_size
        );
    }
}

#[test]
fn test_ratio_with_constant_denominator_matches_plain_blocking() {
    let mut rng = SmallRng::seed_from_u64(3);
    let x: Vec<f64> = (0..256).map(|_| 5.0 + rng.gen::<f64>()).collect();
    let y = vec![2.0; 256];

    let ratio = block_analysis_ratio(&x, &y, 1).unwrap();
    let scaled: Vec<f64> = x.iter().map(|&v| v / 2.0).collect();
    let plain = block_analysis(&scaled, 1).unwrap();

    assert_eq!(ratio.len(), plain.len());
    for (r, p) in ratio.iter().zip(&plain) {
        assert!(
            (r.std_err - p.std_err).abs() < 1e-12,
            "block size {}: {} vs {}",
            r.block_size,
            r.std_err,
            p.std_err
        );
    }
}

#[test]
fn test_std_err_of_std_err_uses_block_count() {
    let mut rng = SmallRng::seed_from_u64(11);
    let data: Vec<f64> = (0..64).map(|_| rng.gen::<f64>()).collect();
    let result = block_analysis(&data, 1).unwrap();
    for entry in &result {
        let num_blocks = 64 / entry.block_size;
        let expected = entry.std_err / (2.0 * (num_blocks - 1) as f64).sqrt();
        assert!((entry.std_err_of_std_err - expected).abs() < 1e-14);
    }
}

#[test]
fn test_correlated_series_error_grows_with_block_size() {
    // AR(1) data: small blocks under-state the true error, so the
    // estimate must rise before it plateaus.
    let mut rng = SmallRng::seed_from_u64(42);
    let mut value = 0.0;
    let data: Vec<f64> = (0..4096)
        .map(|_| {
            value = 0.9 * value + rng.gen::<f64>() - 0.5;
            value
        })
        .collect();
    let result = block_analysis(&data, 1).unwrap();
    let first = result.first().unwrap().std_err;
    let peak = result
        .iter()
        .map(|e| e.std_err)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(
        peak > 2.0 * first,
        "blocking must reveal autocorrelation: first {first}, peak {peak}"
    );
}

#[test]
fn test_empty_input_is_rejected() {
    assert!(matches!(
        block_analysis(&[], 1),
        Err(AnalysisError::InvalidParameter { .. })
    ));
}

#[test]
fn test_ratio_rejects_length_mismatch() {
    let x = vec![1.0; 8];
    let y = vec![1.0; 7];
    assert!(matches!(
        block_analysis_ratio(&x, &y, 1),
        Err(AnalysisError::AlignmentMismatch(_))
    ));
}

#[test]
fn test_ratio_rejects_zero_mean_denominator() {
    let x = vec![1.0, 2.0, 3.0, 4.0];
    let y = vec![-1.0, 1.0, -1.0, 1.0];
    assert!(matches!(
        block_analysis_ratio(&x, &y, 1),
        Err(AnalysisError::UndefinedRatio(_))
    ));
}
