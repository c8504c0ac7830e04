mod common;

use approx::assert_relative_eq;
use common::{random_samples, WaveImage};
use parzen_core::{IntensityRange, TranslationTransform};
use parzen_registration::metric::{
    Metric, MetricInput, ParzenWindowMutualInformation, ParzenWindowNormalizedMutualInformation,
};
use parzen_registration::ParzenHistogramConfig;

fn wave_config(fixed_order: u32, moving_order: u32) -> ParzenHistogramConfig {
    ParzenHistogramConfig::default()
        .with_bins(8, 8)
        .with_kernel_orders(fixed_order, moving_order)
        .with_fixed_intensity_range(IntensityRange::new(0.0, 200.0))
        .with_moving_intensity_range(IntensityRange::new(0.0, 200.0))
}

#[test]
fn test_identical_images() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let samples = random_samples(1000, 0.0, 63.0, 7, WaveImage::value_at);
    let transform = TranslationTransform::<2>::new();
    let input = MetricInput::new(&samples, &transform, &WaveImage);

    let mut metric = ParzenWindowNormalizedMutualInformation::new(wave_config(0, 3));
    metric.initialize(&input)?;
    let aligned = metric.value(&input, &[0.0, 0.0])?;

    // The cubic moving window spreads each sample over several bins, so
    // H(F, M) exceeds both marginals and the bound of -2 is not reached.
    assert!(aligned > -2.0 && aligned < -1.0, "aligned value {aligned}");

    let e = metric.entropies().unwrap();
    let report = format!(
        "aligned {aligned}: H(F,M) {:.4}, H(F) {:.4}, H(M) {:.4}",
        e.joint, e.fixed, e.moving
    );
    assert!(e.joint > e.fixed && e.joint > e.moving, "{report}");
    assert!(e.fixed + e.moving > e.joint, "{report}");
    assert_relative_eq!(aligned, -(e.fixed + e.moving) / e.joint, max_relative = 1e-12);
    assert!(aligned > -1.4 && aligned < -1.15, "{report}");

    let histogram = metric.histogram().unwrap();
    assert_relative_eq!(histogram.total_mass(), 1000.0, max_relative = 1e-12);
    let summary = histogram.last_pass().unwrap();
    assert_eq!((summary.valid, summary.total), (1000, 1000));

    let shifted = metric.value(&input, &[8.0, 5.0])?;
    assert!(shifted > aligned, "shifted {shifted} vs aligned {aligned}");
    Ok(())
}

#[test]
fn test_identical_images_box_kernels_reach_bound() -> anyhow::Result<()> {
    let samples = random_samples(1000, 0.0, 63.0, 7, WaveImage::value_at);
    let transform = TranslationTransform::<2>::new();
    let input = MetricInput::new(&samples, &transform, &WaveImage);

    let mut metric = ParzenWindowNormalizedMutualInformation::new(wave_config(0, 0));
    metric.initialize(&input)?;
    let value = metric.value(&input, &[0.0, 0.0])?;
    assert_eq!(value, -2.0);

    let entropies = metric.entropies().unwrap();
    assert_eq!(entropies.joint, entropies.fixed);
    assert_eq!(entropies.joint, entropies.moving);
    Ok(())
}

#[test]
fn test_mutual_information_prefers_alignment() -> anyhow::Result<()> {
    let samples = random_samples(1000, 0.0, 63.0, 13, WaveImage::value_at);
    let transform = TranslationTransform::<2>::new();
    let input = MetricInput::new(&samples, &transform, &WaveImage);

    let mut metric = ParzenWindowMutualInformation::new(wave_config(0, 3));
    metric.initialize(&input)?;
    let aligned = metric.value(&input, &[0.0, 0.0])?;
    let shifted = metric.value(&input, &[8.0, 5.0])?;
    assert!(aligned < shifted, "aligned {aligned} vs shifted {shifted}");
    assert!(aligned < 0.0);
    Ok(())
}

#[test]
fn test_gradient_points_back_to_alignment() -> anyhow::Result<()> {
    // interior samples, so small shifts keep every sample valid
    let samples = random_samples(1000, 5.0, 58.0, 7, WaveImage::value_at);
    let transform = TranslationTransform::<2>::new();
    let input = MetricInput::new(&samples, &transform, &WaveImage);

    let mut metric = ParzenWindowNormalizedMutualInformation::new(
        ParzenHistogramConfig::default()
            .with_bins(16, 16)
            .with_fixed_intensity_range(IntensityRange::new(0.0, 200.0))
            .with_moving_intensity_range(IntensityRange::new(0.0, 200.0)),
    );
    metric.initialize(&input)?;
    let start = [1.5, -1.0];
    let (value, gradient) = metric.value_and_derivative(&input, &start)?;

    let step = 0.1 / gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
    let next: Vec<f64> = start.iter().zip(&gradient).map(|(p, g)| p - step * g).collect();
    let improved = metric.value(&input, &next)?;
    assert!(improved < value, "{improved} !< {value}");
    Ok(())
}

#[test]
fn test_config_json_round_trip() -> anyhow::Result<()> {
    let config = wave_config(1, 2).with_required_ratio_of_valid_samples(0.5);
    let json = serde_json::to_string(&config)?;
    let parsed: ParzenHistogramConfig = serde_json::from_str(&json)?;
    assert_eq!(parsed, config);

    let partial: ParzenHistogramConfig =
        serde_json::from_str(r#"{ "number_of_fixed_histogram_bins": 16, "moving_kernel_bspline_order": 2 }"#)?;
    assert_eq!(partial.number_of_fixed_histogram_bins, 16);
    assert_eq!(partial.number_of_moving_histogram_bins, 32);
    assert_eq!(partial.moving_kernel_bspline_order, 2);
    assert_eq!(partial.fixed_kernel_bspline_order, 0);
    assert_eq!(partial.required_ratio_of_valid_samples, 0.25);
    assert!(partial.fixed_intensity_range.is_none());
    partial.validate()?;
    Ok(())
}

#[test]
fn test_entropies_serialize() -> anyhow::Result<()> {
    let samples = random_samples(200, 0.0, 63.0, 1, WaveImage::value_at);
    let transform = TranslationTransform::<2>::new();
    let input = MetricInput::new(&samples, &transform, &WaveImage);

    let mut metric = ParzenWindowNormalizedMutualInformation::new(wave_config(0, 3));
    metric.initialize(&input)?;
    metric.value(&input, &[0.0, 0.0])?;

    let value = serde_json::to_value(metric.entropies().unwrap())?;
    for key in ["joint", "fixed", "moving"] {
        assert!(value[key].as_f64().unwrap() > 0.0, "{key}");
    }
    Ok(())
}
