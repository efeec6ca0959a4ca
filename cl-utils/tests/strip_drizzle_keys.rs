use cl_utils::strip_keys::strip_drizzle_keys;
use ndarray::Array2;
use shared::ext_ref::ImageRef;
use shared::io::{read_header_at, read_image};
use test_helpers::fits::{write_fits, TestHdu};

#[test]
fn test_removes_only_drizzle_keys_from_primary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drz.fits");

    let image = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f64);
    write_fits(
        &path,
        &[
            TestHdu::primary(&image)
                .key("D001DATA", "input_flt.fits[sci,1]")
                .key("D001EXPT", 500.0)
                .key("D002DATA", "input2_flt.fits[sci,1]")
                .key("DATE-OBS", "2024-01-01"),
            TestHdu::extension("WHT", 1, &image).key("D001WTSC", 1.0),
        ],
    )
    .unwrap();

    assert_eq!(strip_drizzle_keys(&path).unwrap(), 3);

    let primary = read_header_at(&path, 0).unwrap();
    assert!(!primary.contains("D001DATA"));
    assert!(!primary.contains("D002DATA"));
    assert!(!primary.keywords().any(|k| k.starts_with("D00")));
    assert_eq!(primary.get_str("DATE-OBS"), Some("2024-01-01"));
    assert!(read_header_at(&path, 1).unwrap().contains("D001WTSC"));
    assert_eq!(read_image(&ImageRef::new(&path)).unwrap().data, image);

    // Nothing left to strip
    let before = std::fs::read(&path).unwrap();
    assert_eq!(strip_drizzle_keys(&path).unwrap(), 0);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(strip_drizzle_keys(&dir.path().join("absent.fits")).is_err());
}
