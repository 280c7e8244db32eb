//! Overview rendering against fixture datasets

use dcv_dataset::MemoryDataset;
use dcv_render::{OverviewRenderer, PanelKind, PreviewRenderer, RenderSettings};
use dcv_test_utils::{full_dataset, scatter_dataset};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn full_dataset_draws_all_panels() {
    let preview = OverviewRenderer::new().render(&full_dataset(60)).unwrap();
    assert_eq!(
        preview.panels,
        vec![
            PanelKind::Scatter,
            PanelKind::DensityScatter,
            PanelKind::Image,
            PanelKind::Mask,
            PanelKind::Trace,
        ]
    );
    assert_eq!((preview.width, preview.height), (320, 8 * 120));

    let decoded = image::load_from_memory(&preview.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 960));
}

#[test]
fn no_displayable_feature_yields_placeholder() {
    let preview = OverviewRenderer::new().render(&MemoryDataset::new(10)).unwrap();
    assert!(preview.is_placeholder());
    assert_eq!((preview.width, preview.height), (320, 320));
    assert!(image::load_from_memory(&preview.bytes).is_ok());
}

#[test]
fn empty_dataset_yields_placeholder() {
    let preview = OverviewRenderer::new().render(&scatter_dataset(0)).unwrap();
    assert!(preview.is_placeholder());
    assert_eq!(preview.event_index, None);
}

#[test]
fn representative_event_index() {
    let renderer = OverviewRenderer::new();
    assert_eq!(renderer.render(&full_dataset(10)).unwrap().event_index, Some(9));
    assert_eq!(renderer.render(&full_dataset(1000)).unwrap().event_index, Some(47));
}

#[test]
fn index_counts_only_capped_events() {
    let renderer =
        OverviewRenderer::with_settings(RenderSettings::default().with_max_events(20).with_event_index_cap(47));
    assert_eq!(renderer.render(&full_dataset(100)).unwrap().event_index, Some(19));
}

#[test]
fn rendering_is_deterministic() {
    let renderer = OverviewRenderer::new();
    let a = renderer.render(&full_dataset(200)).unwrap();
    let b = renderer.render(&full_dataset(200)).unwrap();
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn missing_pixel_size_still_renders_mask() {
    let ds = MemoryDataset::new(2)
        .with_frames(
            dcv_dataset::FEATURE_MASK,
            vec![
                dcv_dataset::Frame::new(2, 2, vec![0, 255, 255, 0]).unwrap(),
                dcv_dataset::Frame::new(2, 2, vec![255, 0, 0, 255]).unwrap(),
            ],
        )
        .unwrap();
    let preview = OverviewRenderer::new().render(&ds).unwrap();
    assert_eq!(preview.panels, vec![PanelKind::Mask]);
    assert_eq!(preview.height, 120);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn events_past_the_cap_do_not_change_output(
        extra in 1usize..200,
        area in 0.0f64..1e4,
        deform in -1.0f64..1.0,
    ) {
        let renderer = OverviewRenderer::new();
        let base = scatter_dataset(5000 + extra);
        let mut changed = base.clone();
        for i in 5000..5000 + extra {
            changed.set_scalar("area_um", i, area).unwrap();
            changed.set_scalar("deform", i, deform).unwrap();
        }
        let a = renderer.render(&base).unwrap();
        let b = renderer.render(&changed).unwrap();
        prop_assert_eq!(a.bytes, b.bytes);
    }
}
