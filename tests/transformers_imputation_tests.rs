mod common;

use common::{column_f64, column_names, column_strings, RawFrame};
use datafusion::prelude::DataFrame;
use immo_pipeline::exceptions::{ImmoError, ImmoResult};
use immo_pipeline::io::{load_dataset, session_context};
use immo_pipeline::registry::{imputation_rule_for, ImputationGroup, ImputationRule};
use immo_pipeline::transformers::imputation::MissingValueImputer;

async fn impute(df: &DataFrame) -> ImmoResult<DataFrame> {
    let mut imputer = MissingValueImputer::new();
    imputer.fit(df).await?;
    imputer.transform(df.clone())
}

#[tokio::test]
async fn test_every_group_is_filled() -> ImmoResult<()> {
    let df = RawFrame::new(6)
        .with_f64(
            "Strassenlaenge",
            vec![Some(10.0), None, Some(20.0), Some(30.0), None, Some(40.0)],
        )
        .with_utf8(
            "Garagenqualitaet",
            vec![Some("Gu"), None, Some("Du"), None, Some("Ag"), Some("Gu")],
        )
        .with_utf8(
            "Versorgung",
            vec![Some("EG"), Some("EG"), None, Some("E"), Some("EGWA"), Some("EG")],
        )
        .with_utf8("Mauerwerktyp", vec![None, Some("Stein"), None, None, None, None])
        .with_f64(
            "Garagenflaeche",
            vec![Some(400.0), None, Some(250.0), None, None, Some(300.0)],
        )
        .frame();

    let out = impute(&df).await?;

    assert_eq!(
        column_f64(out.clone(), "Strassenlaenge").await,
        vec![Some(10.0), Some(25.0), Some(20.0), Some(30.0), Some(25.0), Some(40.0)]
    );
    assert_eq!(
        column_strings(out.clone(), "Garagenqualitaet").await[1].as_deref(),
        Some("None")
    );
    assert_eq!(column_strings(out.clone(), "Versorgung").await[2].as_deref(), Some("EG"));
    let masonry = column_strings(out.clone(), "Mauerwerktyp").await;
    assert_eq!(masonry[0].as_deref(), Some("Kein"));
    assert_eq!(masonry[1].as_deref(), Some("Stein"));
    assert_eq!(
        column_f64(out.clone(), "Garagenflaeche").await,
        vec![Some(400.0), Some(0.0), Some(250.0), Some(0.0), Some(0.0), Some(300.0)]
    );

    let names = column_names(&out);
    assert!(!names.contains(&"Id".to_string()));
    assert!(!names.contains(&"Garagenbaujahr".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_mode_ties_go_to_the_smallest_value() -> ImmoResult<()> {
    let df = RawFrame::new(6)
        .with_utf8(
            "Elektrik",
            vec![Some("SBrkr"), Some("FuseA"), Some("SBrkr"), Some("FuseA"), None, Some("Mix")],
        )
        .frame();

    let out = impute(&df).await?;
    assert_eq!(column_strings(out, "Elektrik").await[4].as_deref(), Some("FuseA"));
    Ok(())
}

#[tokio::test]
async fn test_ungoverned_columns_keep_their_nulls() -> ImmoResult<()> {
    let df = RawFrame::new(3)
        .with_utf8("Nachbarschaft", vec![Some("A"), None, Some("B")])
        .frame();

    let out = impute(&df).await?;
    assert_eq!(
        column_strings(out, "Nachbarschaft").await,
        vec![Some("A".to_string()), None, Some("B".to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_governed_column_is_a_schema_mismatch() {
    let df = RawFrame::new(3).without("Strassenlaenge").frame();
    let mut imputer = MissingValueImputer::new();
    let err = imputer.fit(&df).await.unwrap_err();
    assert!(matches!(err, ImmoError::SchemaMismatch(c) if c == "Strassenlaenge"));
}

#[tokio::test]
async fn test_transform_before_fit_is_rejected() {
    let df = RawFrame::new(3).frame();
    let imputer = MissingValueImputer::new();
    assert!(matches!(imputer.transform(df), Err(ImmoError::FitNotCalled)));
}

#[tokio::test]
async fn test_custom_groups_only_touch_their_columns() -> ImmoResult<()> {
    let df = RawFrame::new(3)
        .with_f64("Strassenlaenge", vec![None, Some(5.0), None])
        .with_f64("Garagenflaeche", vec![None, Some(1.0), None])
        .frame();
    let mut imputer = MissingValueImputer::with_groups(vec![ImputationGroup {
        rule: ImputationRule::Zero,
        columns: &["Strassenlaenge"],
    }]);
    imputer.fit(&df).await?;
    let out = imputer.transform(df)?;

    assert_eq!(
        column_f64(out.clone(), "Strassenlaenge").await,
        vec![Some(0.0), Some(5.0), Some(0.0)]
    );
    assert_eq!(
        column_f64(out, "Garagenflaeche").await,
        vec![None, Some(1.0), None]
    );
    Ok(())
}

#[tokio::test]
async fn test_complete_frame_is_left_unchanged() -> ImmoResult<()> {
    let df = RawFrame::new(7).frame();
    let out = impute(&df).await?;

    let kept: Vec<&str> = MissingValueImputer::new()
        .columns()
        .into_iter()
        .filter(|name| imputation_rule_for(name) != Some(ImputationRule::Drop))
        .collect();
    assert!(!kept.is_empty());
    for name in kept {
        assert_eq!(
            column_strings(out.clone(), name).await,
            column_strings(df.clone(), name).await,
            "column {} changed",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_all_empty_mode_column_from_csv_gets_the_sentinel() -> ImmoResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("listings.csv");
    RawFrame::new(2)
        .with_utf8("Wohngebiet", vec![None, None])
        .write_csv(&path);

    let df = load_dataset(&session_context(), &path).await?;
    let out = impute(&df).await?;
    assert_eq!(
        column_strings(out, "Wohngebiet").await,
        vec![Some("None".to_string()), Some("None".to_string())]
    );
    Ok(())
}
