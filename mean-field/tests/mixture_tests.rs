use approx::assert_abs_diff_eq;
use design_util::ModelError;
use mean_field::common::{DVec, Mat};
use mean_field::{GaussianMixture, MixtureFitOptions, MixtureOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two well-separated clusters around `centres`, `n_per` points each.
fn clustered_data(centres: &[Vec<f64>], n_per: usize, sd: f64, seed: u64) -> Mat {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sd).unwrap();
    let d = centres[0].len();
    let n = centres.len() * n_per;

    let mut rows = Vec::with_capacity(n * d);
    for centre in centres {
        for _ in 0..n_per {
            for &c in centre {
                rows.push(c + noise.sample(&mut rng));
            }
        }
    }
    Mat::from_row_iterator(n, d, rows)
}

/// Block-constant responsibility start: points of cluster `i` lean
/// toward component `i`.
fn informed_start(n_per: usize, k: usize) -> Mat {
    Mat::from_fn(k * n_per, k, |i, j| if i / n_per == j { 0.9 } else { 0.1 / (k - 1) as f64 })
}

#[test]
fn test_responsibilities_are_row_stochastic() {
    init_logger();
    let x = clustered_data(&[vec![0.0, 0.0], vec![5.0, 5.0]], 60, 0.6, 11);

    let options = MixtureOptions {
        n_components: 2,
        n_iter: 40,
        seed: 3,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    model.fit(&x, MixtureFitOptions::default()).unwrap();

    let r = model.responsibilities();
    assert_eq!(r.shape(), (120, 2));
    for i in 0..r.nrows() {
        let total: f64 = r.row(i).iter().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-8);
        for &v in r.row(i).iter() {
            assert!((-1e-12..=1.0 + 1e-12).contains(&v));
        }
    }
}

#[test]
fn test_recovers_separated_means() {
    init_logger();
    let x = clustered_data(&[vec![0.0, 0.0], vec![5.0, 5.0]], 60, 0.6, 19);

    let options = MixtureOptions {
        n_components: 2,
        n_iter: 30,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    let fit_options = MixtureFitOptions {
        initial_responsibility: Some(informed_start(60, 2)),
        ..Default::default()
    };
    model.fit(&x, fit_options).unwrap();

    let mut means: Vec<DVec> = model.means().into_iter().cloned().collect();
    means.sort_by(|a, b| a[0].total_cmp(&b[0]));

    assert_abs_diff_eq!(means[0][0], 0.0, epsilon = 0.3);
    assert_abs_diff_eq!(means[0][1], 0.0, epsilon = 0.3);
    assert_abs_diff_eq!(means[1][0], 5.0, epsilon = 0.3);
    assert_abs_diff_eq!(means[1][1], 5.0, epsilon = 0.3);
}

#[test]
fn test_pruning_drops_low_weight_components() {
    init_logger();
    let x = clustered_data(&[vec![0.0, 0.0], vec![5.0, 5.0]], 60, 0.6, 23);
    let n = x.nrows();

    // components 2 and 3 start with ~1% of the mass each, so their
    // expected mixing weight (1 + 1.2) / (4 + 120) falls below 0.02
    let r0 = Mat::from_fn(n, 4, |_, j| if j < 2 { 0.49 } else { 0.01 });

    let options = MixtureOptions {
        n_components: 4,
        n_iter: 20,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    let fit_options = MixtureFitOptions {
        initial_responsibility: Some(r0),
        reduce_components: true,
        prune_threshold: 0.02,
    };
    model.fit(&x, fit_options).unwrap();

    // all K-indexed state shrinks together
    assert_eq!(model.num_components(), 2);
    assert_eq!(model.concentrations().len(), 2);
    assert_eq!(model.means().len(), 2);
    assert_eq!(model.responsibilities().shape(), (n, 2));
    for i in 0..n {
        let total: f64 = model.responsibilities().row(i).iter().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-8);
    }
}

#[test]
fn test_predictive_density_integrates_to_one() {
    init_logger();
    let x = clustered_data(&[vec![0.0], vec![4.0]], 50, 0.5, 31);

    let options = MixtureOptions {
        n_components: 2,
        n_iter: 30,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    let fit_options = MixtureFitOptions {
        initial_responsibility: Some(informed_start(50, 2)),
        ..Default::default()
    };
    model.fit(&x, fit_options).unwrap();

    let step = 0.01;
    let grid_n = 2001; // [-8, 12]
    let grid = Mat::from_fn(grid_n, 1, |i, _| -8.0 + step * i as f64);
    let pdf = model.prob_density(&grid).unwrap();

    assert!(pdf.iter().all(|&v| v >= 0.0));
    let mass: f64 = pdf.iter().sum::<f64>() * step;
    assert_abs_diff_eq!(mass, 1.0, epsilon = 0.02);
}

#[test]
fn test_prior_dimension_mismatch_rejected() {
    let x = clustered_data(&[vec![0.0, 0.0], vec![5.0, 5.0]], 10, 0.5, 5);

    let options = MixtureOptions {
        n_components: 2,
        m0: Some(DVec::zeros(3)),
        n_iter: 5,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    let err = model.fit(&x, MixtureFitOptions::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ModelError>(),
        Some(ModelError::DimensionMismatch(_))
    ));

    let options = MixtureOptions {
        n_components: 2,
        w0: Some(Mat::identity(3, 3)),
        n_iter: 5,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    assert!(model.fit(&x, MixtureFitOptions::default()).is_err());
}

#[test]
fn test_initial_responsibility_shape_rejected() {
    let x = clustered_data(&[vec![0.0, 0.0], vec![5.0, 5.0]], 10, 0.5, 5);

    let options = MixtureOptions {
        n_components: 2,
        n_iter: 5,
        ..Default::default()
    };
    let mut model = GaussianMixture::new(options).unwrap();
    let fit_options = MixtureFitOptions {
        initial_responsibility: Some(Mat::from_element(7, 2, 0.5)),
        ..Default::default()
    };
    let err = model.fit(&x, fit_options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ModelError>(),
        Some(ModelError::DimensionMismatch(_))
    ));
}
