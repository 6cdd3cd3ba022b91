use chipmatch::bank::{enumerate_variants, Orientation, OrientationMode};
use chipmatch::model::TemplateId;
use chipmatch::{CandidateSource, ChipMatchError, OwnedImage, TemplateBank, TemplateSource};

fn gradient(width: usize, height: usize) -> OwnedImage {
    OwnedImage::from_fn(width, height, |x, y| (x * 10 + y * 50) as u8).unwrap()
}

#[test]
fn variants_follow_the_requested_mode() {
    let tpl = gradient(4, 3);
    let variants = enumerate_variants(tpl.view(), OrientationMode::Any).unwrap();
    let tags: Vec<Orientation> = variants.iter().map(|(_, o)| *o).collect();
    assert_eq!(
        tags,
        vec![
            Orientation::Normal,
            Orientation::FlipLeftRight,
            Orientation::FlipUpDown,
            Orientation::FlipBoth
        ]
    );

    let (lr, _) = &variants[1];
    assert_eq!(lr.view().get(0, 0), tpl.view().get(3, 0));
    let (ud, _) = &variants[2];
    assert_eq!(ud.view().get(0, 0), tpl.view().get(0, 2));
    let (both, _) = &variants[3];
    assert_eq!(both.view().get(0, 0), tpl.view().get(3, 2));

    let single = enumerate_variants(tpl.view(), OrientationMode::FlipUpDown).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].0, variants[2].0);
}

#[test]
fn bank_orders_templates_then_orientations() {
    let a = gradient(6, 4);
    let b = gradient(5, 5);
    let sources = [
        TemplateSource {
            source: CandidateSource::Template(TemplateId(10)),
            image: a.view(),
        },
        TemplateSource {
            source: CandidateSource::Template(TemplateId(20)),
            image: b.view(),
        },
    ];
    let bank = TemplateBank::compile(&sources, OrientationMode::Any, 1.0).unwrap();
    assert_eq!(bank.len(), 8);
    let order: Vec<(CandidateSource, Orientation)> = bank
        .variants()
        .iter()
        .map(|v| (v.source(), v.orientation()))
        .collect();
    assert_eq!(order[0], (CandidateSource::Template(TemplateId(10)), Orientation::Normal));
    assert_eq!(order[3], (CandidateSource::Template(TemplateId(10)), Orientation::FlipBoth));
    assert_eq!(order[4], (CandidateSource::Template(TemplateId(20)), Orientation::Normal));

    assert!(bank.ensure_fits(6, 5).is_ok());
    assert_eq!(
        bank.ensure_fits(5, 5).err(),
        Some(ChipMatchError::TemplateTooLarge {
            tpl_width: 6,
            tpl_height: 4,
            area_width: 5,
            area_height: 5,
        })
    );
}

#[test]
fn bank_scales_templates_before_flipping() {
    let a = gradient(8, 6);
    let sources = [TemplateSource {
        source: CandidateSource::Template(TemplateId(0)),
        image: a.view(),
    }];
    let bank = TemplateBank::compile(&sources, OrientationMode::Normal, 2.0).unwrap();
    let variant = bank.variant(0).unwrap();
    assert_eq!((variant.width(), variant.height()), (4, 3));
    assert_eq!(
        TemplateBank::compile(&[], OrientationMode::Any, 1.0).err(),
        Some(ChipMatchError::NoTemplateSelected)
    );
}
