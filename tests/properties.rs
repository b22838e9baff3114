use approx::assert_relative_eq;
use csgt::data::{fiducial, Observable, SyntheticSet};
use csgt::likelihood::{ChiSquare, LikelihoodOptions};
use csgt::optimize::{fit, fit_model, Bounds, GlobalOptions, LocalOptions, Optimizer};
use csgt::*;

fn planck() -> Cosmology {
    Cosmology::new(67.4, 0.3)
}

fn redshifts(n: usize, z_max: f64) -> Vec<f64> {
    (0..=n).map(|i| z_max * i as f64 / n as f64).collect()
}

#[test]
fn constant_minus_one_reproduces_lambda_cdm() {
    let minus_one = |_z: f64| -1.0;
    let rate = ExpansionRate::new(planck(), &minus_one);
    for z in redshifts(60, 3.0) {
        let closed_form = (0.3 * (1.0 + z).powi(3) + 0.7).sqrt();
        assert_relative_eq!(rate.e(z).unwrap(), closed_form, max_relative = 1e-10);
    }
}

#[test]
fn e_of_zero_is_one_for_every_model() {
    let models = [
        DarkEnergy::CosmologicalConstant,
        DarkEnergy::exact_gaussian(0.0833, 1.0),
        DarkEnergy::exact_gaussian(-0.3, 0.2),
        DarkEnergy::logistic_information(20.0),
        DarkEnergy::dissipative_memory(50.0, 0.15, 1.2).unwrap(),
    ];
    for (i, dark_energy) in models.iter().enumerate() {
        let cosmology = Cosmology::new(60.0 + i as f64, 0.2 + 0.05 * i as f64);
        let rate = ExpansionRate::new(cosmology, dark_energy);
        assert_eq!(rate.e(0.0).unwrap(), 1.0);
        let grid = ExpansionGrid::build(rate, 2.0, 50).unwrap();
        assert_eq!(grid.e(0.0).unwrap(), 1.0);
    }
}

#[test]
fn fiducial_gaussian_expansion_is_increasing() {
    let bump = DarkEnergy::exact_gaussian(0.0833, 1.0);
    let rate = ExpansionRate::new(planck(), &bump);
    let values: Vec<f64> = redshifts(150, 3.0)
        .into_iter()
        .map(|z| rate.e(z).unwrap())
        .collect();
    for pair in values.windows(2) {
        assert!(pair[1] > pair[0], "E not increasing: {pair:?}");
    }
}

#[test]
fn lambda_cdm_distance_modulus_at_unit_redshift() {
    let lambda = DarkEnergy::CosmologicalConstant;
    let rate = ExpansionRate::new(planck(), &lambda);
    let mu = rate.try_distance_modulus(1.0, 0.0).unwrap();
    assert!((mu - 44.1824).abs() < 0.01, "mu(1) = {mu}");
    assert_relative_eq!(rate.luminosity_distance(1.0).unwrap(), 6862.55, max_relative = 1e-4);
}

#[test]
fn observations_equal_to_predictions_have_zero_chi_square() {
    let model = Model::exact_gaussian(planck());
    let theta = [0.2, 0.8];
    let template = fiducial::joint_sample().unwrap();

    for options in [LikelihoodOptions::default(), LikelihoodOptions::direct()] {
        let predictions = ChiSquare::new(&model, &template)
            .with_options(options)
            .predictions(&theta)
            .unwrap();
        let sets = template
            .sets()
            .iter()
            .zip(predictions)
            .map(|(set, predicted)| {
                ObservationSet::builder(set.name(), set.observable())
                    .observations(predicted.iter().map(|p| (p.z(), p.predicted(), p.sigma())))
                    .build()
                    .unwrap()
            })
            .collect();
        let own = Dataset::new(sets);
        let chi2 = ChiSquare::new(&model, &own)
            .with_options(options)
            .try_chi_square(&theta)
            .unwrap();
        assert_relative_eq!(chi2, 0.0, epsilon = 1e-18);
    }
}

#[test]
fn noise_free_data_recovers_the_truth() {
    let model = Model::exact_gaussian(planck());
    let truth = [0.15, 0.7];
    let realization = model.realize(&truth).unwrap();
    let sn = SyntheticSet::new("sn", Observable::DistanceModulus)
        .like(&fiducial::pantheon_sample().unwrap())
        .generate(&realization)
        .unwrap();
    let bao = SyntheticSet::new("bao", Observable::HubbleRate)
        .like(&fiducial::desi_bao_sample().unwrap())
        .generate(&realization)
        .unwrap();
    let dataset = Dataset::new(vec![sn, bao]);

    let result = fit_model(
        &model,
        &dataset,
        &Optimizer::local(),
        &LikelihoodOptions::default(),
    )
    .unwrap();
    assert!(result.chi_square < 1e-4, "{result}");
    assert_relative_eq!(result.parameters[0], truth[0], epsilon = 1e-2);
    assert_relative_eq!(result.parameters[1], truth[1], epsilon = 0.1);
}

#[test]
fn global_search_recovers_five_extended_parameters() {
    // Extended preset with the peak and the background offset held at their truth
    let model = Model::extended_gaussian(planck())
        .with_fixed(Parameter::ZPeak, 0.7)
        .with_fixed(Parameter::WOffset, -1.0);
    let truth = [0.15, 0.7, -19.35, 73.0, 0.3];
    assert_eq!(model.n_free(), truth.len());
    let realization = model.realize(&truth).unwrap();

    let sn = SyntheticSet::new("sn", Observable::DistanceModulus)
        .uniform((1..=40).map(|i| 0.05 * i as f64), 0.02)
        .generate(&realization)
        .unwrap();
    let bao = SyntheticSet::new("bao", Observable::HubbleRate)
        .uniform((1..=12).map(|i| 2.0 * i as f64 / 12.0), 0.3)
        .generate(&realization)
        .unwrap();
    let dataset = Dataset::new(vec![sn, bao]);

    let optimizer = Optimizer::Global(
        GlobalOptions::default()
            .with_seed(2024)
            .with_popsize(10)
            .with_max_generations(200)
            .with_parallel(true),
    );
    let result = fit_model(&model, &dataset, &optimizer, &LikelihoodOptions::default()).unwrap();
    assert!(result.chi_square < 1e-2, "{result}");
    let tolerances = [5e-3, 2e-2, 2e-3, 5e-2, 3e-3];
    for ((fitted, expected), tolerance) in result.parameters.iter().zip(truth).zip(tolerances) {
        assert_relative_eq!(*fitted, expected, epsilon = tolerance);
    }
}

#[test]
fn fit_stuck_on_the_penalty_is_not_converged() {
    // d_L(0) = 0, so every prediction of this point is undefined
    let degenerate = ObservationSet::builder("origin", Observable::DistanceModulus)
        .observation(0.0, 0.0, 0.1)
        .build()
        .unwrap();
    let dataset = Dataset::new(vec![degenerate]);
    let model = Model::exact_gaussian(planck());
    let global = Optimizer::Global(GlobalOptions::default().with_seed(3).with_max_generations(5));
    for optimizer in [Optimizer::local(), global] {
        let result = fit_model(&model, &dataset, &optimizer, &LikelihoodOptions::default()).unwrap();
        assert!(!result.converged, "{result}");
        assert!(result.chi_square >= csgt::likelihood::CHI2_PENALTY);
    }
}

#[test]
fn best_fit_respects_every_bounds_configuration() {
    let dataset = fiducial::joint_sample().unwrap();
    let configurations = [
        vec![(-19.38, -19.32), (72.5, 73.5), (0.25, 0.35)],
        vec![(-19.3, -19.3), (60.0, 80.0), (0.3, 0.3)],
        vec![(-19.0, -18.9), (74.0, 74.0), (0.1, 0.15)],
        vec![(-20.0, -19.0), (50.0, 90.0), (0.05, 0.6)],
    ];
    for pairs in configurations {
        let mut model = Model::lambda_cdm(planck());
        for (parameter, &(lo, hi)) in [Parameter::MagnitudeOffset, Parameter::H0, Parameter::OmegaM]
            .iter()
            .zip(pairs.iter())
        {
            model = model.with_bounds(*parameter, lo, hi);
        }
        let bounds = model.bounds().unwrap();
        let objective = ChiSquare::new(&model, &dataset);
        let optimizers = [
            Optimizer::Local(LocalOptions::default().with_initial_guess(model.initial_guess())),
            Optimizer::Global(
                GlobalOptions::default()
                    .with_seed(17)
                    .with_popsize(5)
                    .with_max_generations(30),
            ),
        ];
        for optimizer in optimizers {
            let result = fit(&objective, &bounds, &optimizer).unwrap();
            assert!(
                bounds.contains(&result.parameters),
                "{:?} outside {:?}",
                result.parameters,
                pairs
            );
            assert!(result.chi_square.is_finite());
        }
    }
}

#[test]
fn bounds_are_validated_before_fitting() {
    assert!(Bounds::new(vec![(1.0, 0.0)]).is_err());
    let model = Model::exact_gaussian(planck()).with_bounds(Parameter::Sigma, 2.0, 0.5);
    let dataset = fiducial::joint_sample().unwrap();
    let result = fit_model(
        &model,
        &dataset,
        &Optimizer::local(),
        &LikelihoodOptions::default(),
    );
    assert!(matches!(result, Err(CsgtError::InvalidBounds { .. })));
}
