use approx::{assert_abs_diff_eq, assert_relative_eq};
use mean_field::{Gauss1D, Gauss1DOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

#[test]
fn test_five_point_scenario() {
    let mut model = Gauss1D::new(Gauss1DOptions::default());
    let post = *model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.0).unwrap();

    // diffuse prior: posterior mean is the sample mean, shape is (N+1)/2
    assert_abs_diff_eq!(post.mu, 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(post.a, 3.0);
    assert!(post.b > 0.0);
    assert!(post.lambda > 0.0);
}

#[test]
fn test_large_sample_consistency() {
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(1.5, 0.5).unwrap();
    let x: Vec<f64> = (0..4000).map(|_| noise.sample(&mut rng)).collect();

    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    let mut model = Gauss1D::new(Gauss1DOptions::default());
    let post = *model.fit(&x, 1.0).unwrap();

    assert_abs_diff_eq!(post.mu, mean, epsilon = 1e-9);
    assert_relative_eq!(post.expected_precision(), 1.0 / var, max_relative = 0.02);
}

#[test]
fn test_iteration_cap_is_not_an_error() {
    let options = Gauss1DOptions {
        max_iter: 1,
        threshold: 1e-300,
        ..Default::default()
    };
    let mut model = Gauss1D::new(options);
    let post = *model.fit(&[1.0, 2.0, 3.0], 1.0).unwrap();

    assert!(post.b.is_finite());
    assert!(post.lambda > 0.0);
}
