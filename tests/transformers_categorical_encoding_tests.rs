mod common;

use arrow::datatypes::DataType;
use common::{column_f64, column_names, column_strings, RawFrame};
use immo_pipeline::exceptions::{ImmoError, ImmoResult};
use immo_pipeline::transformers::categorical_encoding::CategoryEncoder;
use immo_pipeline::workflow::FeaturePipeline;

#[tokio::test]
async fn test_ordinal_codes_after_imputation() -> ImmoResult<()> {
    // A missing garage quality becomes the "None" sentinel, which codes to 0.
    let df = RawFrame::new(4)
        .with_utf8("Garagenqualitaet", vec![None, Some("Gu"), Some("Ag"), Some("Sc")])
        .with_utf8("Versorgung", vec![Some("EGWA"), Some("E"), Some("EG"), Some("EGW")])
        .frame();

    let pipeline = FeaturePipeline::new();
    let out = pipeline.encode(pipeline.impute(df).await?).await?;

    assert_eq!(
        out.schema().field_with_unqualified_name("Garagenqualitaet")?.data_type(),
        &DataType::Int64
    );
    assert_eq!(
        column_f64(out.clone(), "Garagenqualitaet").await,
        vec![Some(0.0), Some(4.0), Some(5.0), Some(1.0)]
    );
    assert_eq!(
        column_f64(out, "Versorgung").await,
        vec![Some(3.0), Some(0.0), Some(1.0), Some(2.0)]
    );
    Ok(())
}

#[tokio::test]
async fn test_one_hot_indicators_replace_the_column() -> ImmoResult<()> {
    let df = RawFrame::new(4)
        .with_utf8("Nachbarschaft", vec![Some("Nord"), Some("Sued"), Some("Nord"), None])
        .frame();

    let mut encoder = CategoryEncoder::new();
    encoder.fit(&df).await?;
    assert_eq!(
        encoder.categories.get("Nachbarschaft"),
        Some(&vec!["Nord".to_string(), "Sued".to_string()])
    );
    let out = encoder.transform(df)?;

    let names = column_names(&out);
    assert!(!names.contains(&"Nachbarschaft".to_string()));
    assert_eq!(
        out.schema().field_with_unqualified_name("Nachbarschaft_Nord")?.data_type(),
        &DataType::Boolean
    );
    let flag = |v: &str| Some(v.to_string());
    assert_eq!(
        column_strings(out.clone(), "Nachbarschaft_Nord").await,
        vec![flag("true"), flag("false"), flag("true"), flag("false")]
    );
    assert_eq!(
        column_strings(out, "Nachbarschaft_Sued").await,
        vec![flag("false"), flag("true"), flag("false"), flag("false")]
    );
    Ok(())
}

#[tokio::test]
async fn test_air_conditioning_flag_is_boolean() -> ImmoResult<()> {
    let df = RawFrame::new(3)
        .with_utf8("Klimalanlage", vec![Some("N"), Some("J"), Some("J")])
        .frame();

    let mut encoder = CategoryEncoder::new();
    encoder.fit(&df).await?;
    let out = encoder.transform(df)?;
    assert_eq!(
        column_strings(out, "Klimalanlage").await,
        vec![
            Some("false".to_string()),
            Some("true".to_string()),
            Some("true".to_string())
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_unmapped_ordinal_value_fails() {
    let df = RawFrame::new(3)
        .with_utf8("Versorgung", vec![Some("EG"), Some("XYZ"), Some("E")])
        .frame();

    let mut encoder = CategoryEncoder::new();
    let err = encoder.fit(&df).await.unwrap_err();
    match err {
        ImmoError::UnmappedCategory { column, value } => {
            assert_eq!(column, "Versorgung");
            assert_eq!(value, "XYZ");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_ordinal_value_without_imputation_fails() {
    let df = RawFrame::new(3)
        .with_utf8("Grundstuecksform", vec![Some("Reg"), None, Some("IR3")])
        .frame();

    let pipeline = FeaturePipeline::new();
    let imputed = pipeline.impute(df).await.unwrap();
    let err = pipeline.encode(imputed).await.unwrap_err();
    assert!(matches!(
        err,
        ImmoError::UnmappedCategory { column, value } if column == "Grundstuecksform" && value == "<missing>"
    ));
}

#[tokio::test]
async fn test_transform_before_fit_is_rejected() {
    let encoder = CategoryEncoder::new();
    let err = encoder.transform(RawFrame::new(2).frame()).unwrap_err();
    assert!(matches!(err, ImmoError::FitNotCalled));
}
