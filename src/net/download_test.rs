use super::*;

fn fixed_time() -> OffsetDateTime {
    // 2025-03-14 09:05:00 UTC
    OffsetDateTime::from_unix_timestamp(1_741_943_100).unwrap()
}

#[test]
fn plain_quoted_filename_is_extracted() {
    assert_eq!(
        filename_from_content_disposition(r#"attachment; filename="rapport_global.pdf""#).as_deref(),
        Some("rapport_global.pdf")
    );
}

#[test]
fn unquoted_filename_is_extracted() {
    assert_eq!(
        filename_from_content_disposition("attachment; filename=etudiants_20250314_0905.xlsx").as_deref(),
        Some("etudiants_20250314_0905.xlsx")
    );
}

#[test]
fn semicolon_inside_quotes_stays_in_filename() {
    assert_eq!(
        filename_from_content_disposition(r#"attachment; filename="rapport; final.pdf""#).as_deref(),
        Some("rapport; final.pdf")
    );
    assert_eq!(
        filename_from_content_disposition(r#"attachment; filename="bilan \"S1\"; GI.xlsx"; size=10"#).as_deref(),
        Some(r#"bilan "S1"; GI.xlsx"#)
    );
}

#[test]
fn extended_filename_wins_and_is_decoded() {
    let header = r#"attachment; filename="rapport_fili_re.pdf"; filename*=UTF-8''rapport_fili%C3%A8re_GI.pdf"#;
    assert_eq!(filename_from_content_disposition(header).as_deref(), Some("rapport_filière_GI.pdf"));
}

#[test]
fn malformed_extended_value_falls_back_to_plain() {
    let header = r#"attachment; filename*=UTF-8''bad%zz.pdf; filename="ok.pdf""#;
    assert_eq!(filename_from_content_disposition(header).as_deref(), Some("ok.pdf"));
}

#[test]
fn directory_components_are_stripped() {
    assert_eq!(
        filename_from_content_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
        Some("passwd")
    );
    assert!(filename_from_content_disposition(r#"attachment; filename="..""#).is_none());
}

#[test]
fn header_without_filename_yields_none() {
    assert!(filename_from_content_disposition("inline").is_none());
    assert!(filename_from_content_disposition(r#"attachment; filename="""#).is_none());
}

#[test]
fn synthesized_name_uses_stem_timestamp_and_extension() {
    assert_eq!(synthesize_filename("modules", FileKind::Excel, fixed_time()), "modules_20250314_0905.xlsx");
    assert_eq!(synthesize_filename("rapport_global", FileKind::Pdf, fixed_time()), "rapport_global_20250314_0905.pdf");
}

#[test]
fn from_response_prefers_header_name() {
    let dl = Download::from_response(
        Some(r#"attachment; filename="x.pdf""#),
        Some("application/pdf".to_owned()),
        b"%PDF".to_vec(),
        "rapport_global",
        FileKind::Pdf,
    );
    assert_eq!(dl.filename, "x.pdf");
    assert_eq!(dl.content_type.as_deref(), Some("application/pdf"));
}

#[test]
fn from_response_synthesizes_without_header() {
    let dl = Download::from_response(None, None, vec![1, 2, 3], "interventions", FileKind::Excel);
    assert!(dl.filename.starts_with("interventions_"));
    assert!(dl.filename.ends_with(".xlsx"));
}

#[test]
fn save_into_writes_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let dl = Download { filename: "a.pdf".to_owned(), content_type: None, bytes: b"%PDF-1.4".to_vec() };
    let path = dl.save_into(&tmp.path().join("out")).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4");
}
