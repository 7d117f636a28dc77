use std::sync::Arc;

use geo::{Coord, Rect};
use rstest::rstest;

use super::*;
use crate::{
    components::{
        band::SourceEntry,
        bounds::{Envelope, GridExtent},
        transforms::PixelTransform,
    },
    testutils::{
        constant_source, failing_source, grid, image_source, memory_source, source,
        unreadable_source, WGS84,
    },
};

fn strip(values: [f64; 3]) -> SourceRef {
    memory_source((0., 1.), 1., (3, 1), values.to_vec())
}

fn read_all(aggregate: &Aggregate) -> Raster {
    let geometry = aggregate.grid_geometry().unwrap();
    aggregate.read(&geometry).unwrap()
}

#[test_log::test]
fn highest_priority_defined_sample_wins() {
    let nan = f64::NAN;
    let band = VirtualBand::new(vec![
        SourceEntry::new(strip([1., nan, nan]), 0),
        SourceEntry::new(strip([2., 2., nan]), 0),
        SourceEntry::new(strip([3., 3., 3.]), 0),
    ])
    .unwrap();
    let aggregate = Aggregate::new(Mode::Order);
    assert_eq!(aggregate.add_band(band).unwrap(), 0);
    assert_eq!(read_all(&aggregate).band_values(0), vec![1., 2., 3.]);
}

#[test_log::test]
fn integer_zero_samples_keep_their_priority() {
    let int_strip = |values: Vec<f64>, no_data: Option<f64>| {
        source(grid((0., 1.), 1., (3, 1)), SampleType::Int, no_data, vec![values])
    };
    let band = VirtualBand::new(vec![
        SourceEntry::new(int_strip(vec![0., -1., -1.], Some(-1.)), 0),
        SourceEntry::new(int_strip(vec![2., 2., -1.], Some(-1.)), 0),
        SourceEntry::new(int_strip(vec![3., 3., 3.], Some(-1.)), 0),
    ])
    .unwrap();
    let aggregate = Aggregate::new(Mode::Order);
    aggregate.add_band(band).unwrap();
    let raster = read_all(&aggregate);
    assert_eq!(raster.sample_type(), SampleType::Int);
    assert_eq!(raster.band_values(0), vec![0., 2., 3.]);

    let undeclared = VirtualBand::new(vec![
        SourceEntry::new(int_strip(vec![0., 5., 0.], None), 0),
        SourceEntry::new(int_strip(vec![9., 9., 9.], None), 0),
    ])
    .unwrap();
    let aggregate = Aggregate::new(Mode::Order);
    aggregate.add_band(undeclared).unwrap();
    assert_eq!(read_all(&aggregate).band_values(0), vec![0., 5., 0.]);
}

#[test_log::test]
fn forced_narrow_type_reports_the_stored_marker() {
    let aggregate = Aggregate::from_resources(
        Mode::Order,
        [source(
            grid((0., 1.), 1., (2, 1)),
            SampleType::Short,
            Some(-1.),
            vec![vec![4., -1.]],
        )],
    )
    .unwrap();
    aggregate.set_sample_type(SampleType::Byte);
    let raster = aggregate.read(&grid((0., 1.), 1., (3, 1))).unwrap();
    assert_eq!(raster.sample_type(), SampleType::Byte);
    assert_eq!(raster.no_data(0), 0.);
    assert_eq!(raster.band_values(0), vec![4., 0., 0.]);
    assert_eq!(raster.defined_value(0, 1, 0), None);
    assert_eq!(RasterResource::no_data(&aggregate, 0), Some(0.));
}

#[test_log::test]
fn value_transform_applies_before_compositing() {
    let scaled = memory_source((0., 1.), 1., (2, 1), vec![1., f64::NAN]);
    let band = VirtualBand::new(vec![
        SourceEntry::new(scaled, 0).with_transform(|value| value * 10.),
        SourceEntry::new(constant_source((0., 1.), (2, 1), 5.), 0),
    ])
    .unwrap();
    let aggregate = Aggregate::new(Mode::Order);
    aggregate.add_band(band).unwrap();
    assert_eq!(read_all(&aggregate).band_values(0), vec![10., 5.]);
}

#[test_log::test]
fn envelope_grows_with_sources_and_shrinks_back() {
    let aggregate = Aggregate::new(Mode::Order);
    let west = constant_source((0., 2.), (2, 2), 1.);
    let east = constant_source((2., 2.), (2, 2), 2.);

    aggregate.add_resource(west).unwrap();
    let before = aggregate.grid_geometry().unwrap().envelope().clone();
    assert_eq!(aggregate.add_resource(east.clone()).unwrap(), 1..2);
    let after = aggregate.grid_geometry().unwrap();
    assert!(after.envelope().contains(&before));
    assert_eq!(after.envelope().rect(), Rect::new((0., 0.), (4., 2.)));
    assert_eq!(after.extent().unwrap().shape(), (4, 2));

    assert!(aggregate.remove(&east));
    assert_eq!(aggregate.band_count(), 1);
    assert_eq!(aggregate.grid_geometry().unwrap().envelope(), &before);
}

#[test_log::test]
fn removing_an_unknown_source_changes_nothing() {
    let aggregate = Aggregate::from_resources(Mode::Order, [constant_source((0., 1.), (1, 1), 1.)])
        .unwrap();
    let events = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&events);
    aggregate.subscribe(EventKind::Content, move |_| *counter.lock() += 1);
    assert!(!aggregate.remove(&constant_source((0., 1.), (1, 1), 1.)));
    assert_eq!(*events.lock(), 0);
    assert_eq!(aggregate.band_count(), 1);
}

#[rstest]
#[case::coarse_first(false)]
#[case::fine_first(true)]
fn scale_mode_keeps_the_finest_resolution(#[case] fine_first: bool) {
    let coarse = memory_source((0., 4.), 2., (2, 2), vec![1.; 4]);
    let fine = memory_source((0., 4.), 0.5, (8, 8), vec![2.; 64]);
    let sources = if fine_first {
        [fine, coarse]
    } else {
        [coarse, fine]
    };
    let aggregate = Aggregate::from_resources(Mode::Scale, sources).unwrap();
    let geometry = aggregate.grid_geometry().unwrap();
    assert_eq!(geometry.resolution(), Coord { x: 0.5, y: 0.5 });
    assert_eq!(geometry.extent().unwrap().shape(), (8, 8));
}

#[test_log::test]
fn order_mode_keeps_the_first_grid() {
    let coarse = memory_source((0., 4.), 2., (2, 2), vec![1.; 4]);
    let fine = memory_source((0., 4.), 0.5, (8, 8), vec![2.; 64]);
    let aggregate = Aggregate::from_resources(Mode::Order, [coarse, fine]).unwrap();
    assert_eq!(
        aggregate.grid_geometry().unwrap().resolution(),
        Coord { x: 2., y: 2. }
    );

    aggregate.set_mode(Mode::Scale);
    assert_eq!(
        aggregate.grid_geometry().unwrap().resolution(),
        Coord { x: 0.5, y: 0.5 }
    );
    assert_eq!(read_all(&aggregate).band_values(0), vec![1.; 64]);
}

#[test_log::test]
fn sample_type_follows_promotion_unless_forced() {
    let typed = |col: f64, sample_type: SampleType| {
        source(grid((col, 1.), 1., (1, 1)), sample_type, None, vec![vec![1.]])
    };
    let aggregate = Aggregate::new(Mode::Order);
    aggregate.add_resource(typed(0., SampleType::Int)).unwrap();
    assert_eq!(aggregate.sample_type(), SampleType::Int);
    aggregate.add_resource(typed(1., SampleType::Short)).unwrap();
    assert_eq!(aggregate.sample_type(), SampleType::Int);
    aggregate.add_resource(typed(2., SampleType::Float)).unwrap();
    assert_eq!(aggregate.sample_type(), SampleType::Float);

    aggregate.set_sample_type(SampleType::Int);
    aggregate.add_resource(typed(3., SampleType::Double)).unwrap();
    assert_eq!(aggregate.sample_type(), SampleType::Int);
    assert_eq!(read_all(&aggregate).sample_type(), SampleType::Int);

    aggregate.set_sample_type(SampleTypeSelection::Auto);
    assert_eq!(aggregate.sample_type(), SampleType::Double);
}

#[test_log::test]
fn integer_output_uses_the_declared_no_data() {
    let aggregate = Aggregate::from_resources(
        Mode::Order,
        [source(
            grid((0., 1.), 1., (2, 1)),
            SampleType::Short,
            Some(-1.),
            vec![vec![4., -1.]],
        )],
    )
    .unwrap();
    let raster = aggregate.read(&grid((0., 1.), 1., (3, 1))).unwrap();
    assert_eq!(raster.sample_type(), SampleType::Short);
    assert_eq!(raster.no_data(0), -1.);
    assert_eq!(raster.band_values(0), vec![4., -1., -1.]);
    assert_eq!(raster.defined_value(0, 1, 0), None);
}

#[rstest]
#[case::without_geometry(failing_source())]
#[case::unreadable(unreadable_source(grid((0., 2.), 1., (2, 2))))]
fn failing_source_reads_as_if_absent(#[case] failing: SourceRef) {
    let healthy = memory_source((0., 2.), 1., (2, 2), vec![1., 2., 3., 4.]);
    let reference = Aggregate::from_resources(Mode::Order, [healthy.clone()]).unwrap();
    let target = reference.grid_geometry().unwrap();

    let band = VirtualBand::new(vec![
        SourceEntry::new(failing, 0),
        SourceEntry::new(healthy, 0),
    ])
    .unwrap();
    let aggregate = Aggregate::new(Mode::Order);
    aggregate.add_band(band).unwrap();

    assert_eq!(aggregate.grid_geometry(), Some(target.clone()));
    assert_eq!(
        aggregate.read(&target).unwrap().band_values(0),
        reference.read(&target).unwrap().band_values(0)
    );
}

#[test_log::test]
fn flipped_axis_reads_like_north_up() {
    let north_up = memory_source((0., 2.), 1., (2, 2), vec![1., 2., 3., 4.]);
    let flipped = source(
        GridGeometry::new(
            GridExtent::new((0, 0), (2, 2)),
            PixelTransform::new(1., 0., 0., 0., 1., 0.).unwrap(),
            Crs::new(WGS84),
        ),
        SampleType::Double,
        None,
        vec![vec![3., 4., 1., 2.]],
    );
    let target = grid((0., 2.), 1., (2, 2));
    let lhs = Aggregate::from_resources(Mode::Order, [north_up]).unwrap();
    let rhs = Aggregate::from_resources(Mode::Order, [flipped]).unwrap();
    assert_eq!(
        lhs.read(&target).unwrap().band_values(0),
        rhs.read(&target).unwrap().band_values(0)
    );
}

#[test_log::test]
fn flipped_source_extends_the_aggregate_upward() {
    let below = memory_source((0., 2.), 1., (2, 2), vec![1., 2., 3., 4.]);
    let above = source(
        GridGeometry::new(
            GridExtent::new((0, 0), (2, 2)),
            PixelTransform::new(1., 0., 0., 0., 1., 2.).unwrap(),
            Crs::new(WGS84),
        ),
        SampleType::Double,
        None,
        vec![vec![5., 6., 7., 8.]],
    );
    let band = VirtualBand::new(vec![SourceEntry::new(below, 0), SourceEntry::new(above, 0)])
        .unwrap();
    let aggregate = Aggregate::new(Mode::Order);
    aggregate.add_band(band).unwrap();

    let geometry = aggregate.grid_geometry().unwrap();
    assert_eq!(geometry.envelope().rect(), Rect::new((0., 0.), (2., 4.)));
    assert_eq!(geometry.extent().unwrap().low(), Coord { x: 0, y: -2 });
    assert_eq!(
        read_all(&aggregate).band_values(0),
        vec![7., 8., 5., 6., 1., 2., 3., 4.]
    );
}

#[test_log::test]
fn rereads_are_bitwise_identical() {
    let aggregate = Aggregate::from_resources(
        Mode::Scale,
        [
            memory_source((0., 2.), 1., (2, 2), vec![1., f64::NAN, 3., 4.]),
            memory_source((1., 2.), 0.5, (6, 4), (0..24).map(f64::from).collect()),
        ],
    )
    .unwrap();
    aggregate.set_interpolation(Interpolation::Bilinear);
    let target = GridGeometry::from_envelope(
        Envelope::new(Crs::new(WGS84), Rect::new((0., 0.), (4., 2.))),
        (0.25, 0.25),
    )
    .unwrap();
    let bits = |raster: Raster| -> Vec<Vec<u64>> {
        (0..raster.band_count())
            .map(|band| raster.band_values(band).iter().map(|v| v.to_bits()).collect())
            .collect()
    };
    let first = bits(aggregate.read(&target).unwrap());
    let second = bits(aggregate.read(&target).unwrap());
    assert_eq!(first, second);
}

#[rstest]
#[case(Interpolation::Nearest, 0.)]
#[case(Interpolation::Bilinear, 2.5)]
fn interpolation_is_applied_on_finer_targets(
    #[case] interpolation: Interpolation,
    #[case] expected: f64,
) {
    let aggregate = Aggregate::from_resources(
        Mode::Order,
        [memory_source((0., 2.), 1., (2, 2), vec![0., 10., 0., 10.])],
    )
    .unwrap();
    aggregate.set_interpolation(interpolation);
    let raster = aggregate.read(&grid((0., 2.), 0.5, (4, 4))).unwrap();
    assert_eq!(raster.value(0, 1, 1), Some(expected));
}

#[test_log::test]
fn incompatible_crs_is_excluded() {
    let aggregate = Aggregate::new(Mode::Order);
    aggregate
        .add_resource(constant_source((0., 2.), (2, 2), 1.))
        .unwrap();
    let foreign = source(
        GridGeometry::north_up((0., 2.), (1., 1.), (4, 4), Crs::new("EPSG:32633")).unwrap(),
        SampleType::Double,
        None,
        vec![vec![9.; 16]],
    );
    aggregate.add_resource(foreign).unwrap();
    aggregate.add_resource(image_source((4, 4), 7.)).unwrap();

    assert_eq!(aggregate.band_count(), 3);
    assert_eq!(aggregate.working_crs(), Some(Crs::new(WGS84)));
    let geometry = aggregate.grid_geometry().unwrap();
    assert_eq!(geometry.envelope().rect(), Rect::new((0., 0.), (2., 2.)));

    let raster = aggregate.read(&geometry).unwrap();
    assert_eq!(raster.band_values(0), vec![1.; 4]);
    assert!(raster.band_values(1).iter().all(|value| value.is_nan()));
    assert!(raster.band_values(2).iter().all(|value| value.is_nan()));
}

#[test_log::test]
fn explicit_crs_overrides_inference() {
    let aggregate = Aggregate::from_resources(Mode::Order, [constant_source((0., 2.), (2, 2), 1.)])
        .unwrap();
    aggregate.set_crs(Some(Crs::new("EPSG:32633")));
    assert_eq!(aggregate.grid_geometry(), None);
    assert!(matches!(
        aggregate.read(&grid((0., 2.), 1., (2, 2))),
        Err(MosaicError::CrsMismatch { .. })
    ));
    aggregate.set_crs(None);
    assert_eq!(aggregate.working_crs(), Some(Crs::new(WGS84)));
}

#[test_log::test]
fn image_sources_alone_have_no_geometry() {
    let aggregate = Aggregate::from_resources(Mode::Order, [image_source((2, 2), 1.)]).unwrap();
    assert_eq!(aggregate.working_crs(), None);
    assert_eq!(aggregate.grid_geometry(), None);
}

#[test_log::test]
fn empty_aggregate_reads_nothing() {
    let aggregate = Aggregate::default();
    assert_eq!(aggregate.grid_geometry(), None);
    assert_eq!(aggregate.sample_type(), SampleType::Double);
    assert!(matches!(
        RasterResource::grid_geometry(&aggregate),
        Err(MosaicError::NoEnvelope)
    ));
    let raster = aggregate.read(&grid((0., 2.), 1., (2, 2))).unwrap();
    assert_eq!(raster.band_count(), 0);
    assert_eq!(raster.shape(), (2, 2));
}

#[test_log::test]
fn events_follow_content_model_aggregation() {
    let aggregate = Aggregate::new(Mode::Order);
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let changes = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::Aggregation, EventKind::Model, EventKind::Content] {
        let kinds = Arc::clone(&kinds);
        let changes = Arc::clone(&changes);
        aggregate.subscribe(kind, move |event| {
            kinds.lock().push(event.kind());
            if let AggregateEvent::Aggregation(change) = event {
                changes.lock().push(change.clone());
            }
        });
    }

    let source = constant_source((0., 1.), (1, 1), 1.);
    aggregate.add_resource(source.clone()).unwrap();
    aggregate.remove(&source);

    use EventKind::*;
    assert_eq!(
        *kinds.lock(),
        vec![Content, Model, Aggregation, Content, Model, Aggregation]
    );
    let changes = changes.lock();
    assert!(matches!(
        &changes[0],
        AggregationChange::Added { sources, bands } if sources == &[source.clone()] && *bands == (0..1)
    ));
    assert!(matches!(
        &changes[1],
        AggregationChange::Removed { sources, bands } if sources == &[source.clone()] && bands == &[0]
    ));
}

#[test_log::test]
fn model_event_carries_the_new_geometry() {
    let aggregate = Aggregate::new(Mode::Order);
    let geometries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&geometries);
    let id = aggregate.subscribe(EventKind::Model, move |event| {
        if let AggregateEvent::ModelChanged { geometry } = event {
            sink.lock().push(geometry.clone());
        }
    });
    aggregate
        .add_resource(constant_source((0., 2.), (2, 2), 1.))
        .unwrap();
    aggregate.clear();
    assert!(aggregate.unsubscribe(id));
    aggregate
        .add_resource(constant_source((0., 2.), (2, 2), 1.))
        .unwrap();

    let geometries = geometries.lock();
    assert_eq!(geometries.len(), 2);
    assert_eq!(geometries[0], Some(grid((0., 2.), 1., (2, 2))));
    assert_eq!(geometries[1], None);
}

#[test_log::test]
fn remove_band_keeps_the_others() {
    let first = constant_source((0., 1.), (1, 1), 1.);
    let second = constant_source((1., 1.), (1, 1), 2.);
    let aggregate = Aggregate::from_resources(Mode::Order, [first.clone(), second]).unwrap();
    assert!(aggregate.remove_band(5).is_none());
    let removed = aggregate.remove_band(1).unwrap();
    assert!(!removed.references(&first));
    assert_eq!(aggregate.sources(), vec![first]);
    assert_eq!(
        aggregate.grid_geometry().unwrap().envelope().rect(),
        Rect::new((0., 0.), (1., 1.))
    );
}

#[test_log::test]
fn band_selection_is_checked() {
    let two_bands = source(
        grid((0., 1.), 1., (1, 1)),
        SampleType::Byte,
        None,
        vec![vec![1.], vec![2.]],
    );
    let aggregate = Aggregate::new(Mode::Order);
    assert!(matches!(
        aggregate.add_resource_bands(two_bands.clone(), Indexes::from([2])),
        Err(MosaicError::BandOutOfRange { band: 2, count: 2 })
    ));
    assert_eq!(
        aggregate
            .add_resource_bands(two_bands, Indexes::from([1]))
            .unwrap(),
        0..1
    );
    assert_eq!(read_all(&aggregate).band_values(0), vec![2.]);
    assert!(matches!(
        aggregate.add_bands(vec![]),
        Ok(range) if range.is_empty()
    ));
}

#[test_log::test]
fn aggregates_nest_as_resources() {
    let inner = Arc::new(
        Aggregate::from_resources(
            Mode::Order,
            [
                memory_source((0., 2.), 1., (2, 2), vec![1., 2., 3., 4.]),
                memory_source((0., 2.), 1., (2, 2), vec![5., 6., 7., 8.]),
            ],
        )
        .unwrap(),
    );
    let outer = Aggregate::from_resources(Mode::Order, [inner.clone()]).unwrap();
    assert_eq!(outer.band_count(), 2);
    assert_eq!(outer.grid_geometry(), inner.grid_geometry());
    assert_eq!(read_all(&outer).band_values(1), vec![5., 6., 7., 8.]);

    let corner = RasterResource::read(&*inner, &grid((1., 2.), 1., (1, 1)), &Indexes::from([1]))
        .unwrap();
    assert_eq!(corner.band_values(0), vec![6.]);
    assert_eq!(RasterResource::no_data(&*inner, 0), None);
}

#[test_log::test]
fn config_round_trips_through_the_aggregate() {
    let config = AggregateConfig {
        mode: Mode::Scale,
        interpolation: Interpolation::Bilinear,
        sample_type: SampleType::Short.into(),
        crs: Some(Crs::new(WGS84)),
    };
    let aggregate = Aggregate::with_config(&config);
    assert_eq!(aggregate.config(), config);
    assert_eq!(aggregate.working_crs(), Some(Crs::new(WGS84)));
    assert_eq!(aggregate.sample_type(), SampleType::Short);
}
