use chipmatch::image::downscale_area;
use chipmatch::{
    ChipMatchError, ErrorKind, ImageView, OwnedImage, Rect, ScaleMap, TemplatePlan, WorkingImage,
};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        ChipMatchError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::from_slice(&data, 1, 0).err().unwrap();
    assert_eq!(
        err,
        ChipMatchError::InvalidDimensions {
            width: 1,
            height: 0,
        }
    );
}

#[test]
fn image_view_rejects_invalid_stride() {
    let data = [0u8; 8];

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        ChipMatchError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );
}

#[test]
fn image_view_rejects_small_buffer() {
    let data = [0u8; 3];

    let err = ImageView::new(&data, 2, 2, 2).err().unwrap();
    assert_eq!(err, ChipMatchError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn region_views_share_the_parent_buffer() {
    let data: Vec<u8> = (0u8..16).collect();
    let view = ImageView::from_slice(&data, 4, 4).unwrap();

    let sub = view.region(Rect::new(1, 1, 2, 2)).unwrap();
    assert_eq!(sub.width(), 2);
    assert_eq!(sub.height(), 2);
    assert_eq!(sub.stride(), 4);
    assert_eq!(sub.row(0).unwrap(), &[5u8, 6u8]);
    assert_eq!(sub.row(1).unwrap(), &[9u8, 10u8]);
    assert!(sub.get(2, 0).is_none());

    let err = view.region(Rect::new(3, 3, 2, 2)).err().unwrap();
    assert_eq!(
        err,
        ChipMatchError::InvalidRegion {
            x: 3,
            y: 3,
            width: 2,
            height: 2,
            img_width: 4,
            img_height: 4,
        }
    );
    assert!(view.region(Rect::new(0, 0, 0, 2)).is_err());
}

#[test]
fn owned_image_requires_exact_buffer() {
    assert!(OwnedImage::new(vec![0; 6], 3, 2).is_ok());
    assert_eq!(
        OwnedImage::new(vec![0; 5], 3, 2).err(),
        Some(ChipMatchError::BufferTooSmall { needed: 6, got: 5 })
    );
    assert!(OwnedImage::new(vec![0; 7], 3, 2).is_err());
}

#[test]
fn flat_template_is_degenerate() {
    let flat = OwnedImage::new(vec![90; 12], 4, 3).unwrap();
    let err = TemplatePlan::from_view(flat.view()).err().unwrap();
    assert!(matches!(err, ChipMatchError::DegenerateTemplate { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn error_kinds_partition_the_taxonomy() {
    assert_eq!(ChipMatchError::MissingImage { id: 1 }.kind(), ErrorKind::Resource);
    assert_eq!(
        ChipMatchError::MalformedGraph {
            reason: "x".to_string()
        }
        .kind(),
        ErrorKind::Graph
    );
    assert_eq!(ChipMatchError::NoTemplateSelected.kind(), ErrorKind::Validation);
    assert_eq!(ChipMatchError::RunInProgress.kind(), ErrorKind::Validation);
}

#[test]
fn downscale_by_two_averages_blocks() {
    let img = OwnedImage::from_fn(4, 2, |x, _| if x < 2 { 10 } else { 21 }).unwrap();
    let half = downscale_area(img.view(), 2.0).unwrap();
    assert_eq!((half.width(), half.height()), (2, 1));
    assert_eq!(half.data(), &[10, 21]);

    let tiny = downscale_area(img.view(), 8.0).unwrap();
    assert_eq!((tiny.width(), tiny.height()), (1, 1));
    assert!(downscale_area(img.view(), 0.5).is_err());
}

#[test]
fn working_image_maps_back_to_the_region() {
    let img = OwnedImage::from_fn(40, 30, |x, y| (x + y) as u8).unwrap();
    let working = WorkingImage::build(img.view(), Rect::new(8, 6, 20, 12), 2.0).unwrap();
    assert_eq!((working.width(), working.height()), (10, 6));

    let map = working.map();
    assert_eq!(map.corner_to_source(3.0, 2.0), (14.0, 10.0));
    assert_eq!(map.corner_to_scaled(14.0, 10.0), (3.0, 2.0));
    assert_eq!(map.center_to_source(0.0, 0.0), (8.5, 6.5));

    let identity = ScaleMap::new(0.0, 0.0, 1.0);
    assert_eq!(identity.center_to_source(5.0, 7.0), (5.0, 7.0));
}
