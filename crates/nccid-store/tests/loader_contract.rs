// SPDX-License-Identifier: Apache-2.0

use nccid_store::{LoadErrorCode, Loader, RemoteSourceConfig, SourceLocation};
use std::fmt::Write as _;
use std::path::Path;
use tempfile::tempdir;

const HEADER: &str = "Pseudonym,group,filename_covid_status,age_update,sex_update,ethnicity,SubmittingCentre,filename_earliest_date\n";

fn patient_csv(good: usize, malformed: usize) -> String {
    let mut out = HEADER.to_string();
    for i in 0..good {
        let group = if i % 4 == 0 { "validation" } else { "training" };
        let status = if i % 2 == 0 { "True" } else { "False" };
        let sex = ["M", "F", "Unknown"][i % 3];
        let age = 20 + i % 60;
        let day = 1 + i % 9;
        writeln!(out, "Covid{i},{group},{status},{age},{sex},White,RYJ,2021-01-0{day}")
            .expect("write row");
    }
    for i in 0..malformed {
        // alternate between the ways a row can go wrong
        let written = match i % 3 {
            0 => writeln!(out, "Bad{i},not-a-group,True,40,M,White,RYJ,"),
            1 => writeln!(out, "Bad{i},training,True,-1,M,White,RYJ,"),
            _ => writeln!(out, "Bad{i},training"),
        };
        written.expect("write row");
    }
    out
}

fn loader() -> Loader {
    Loader::from_remote_config(RemoteSourceConfig::default())
}

fn local(path: &Path) -> SourceLocation {
    SourceLocation::parse(&format!("local:{}", path.display())).expect("location")
}

#[tokio::test]
async fn malformed_rows_are_skipped_and_counted() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("patient_clean.csv");
    std::fs::write(&path, patient_csv(100, 3)).expect("write csv");

    let snapshot = loader().load(&local(&path)).await.expect("load");
    assert_eq!(snapshot.len(), 100);
    assert_eq!(snapshot.summary().total_rows, 103);
    assert_eq!(snapshot.summary().skipped_rows, 3);
    assert_eq!(snapshot.summary().content_sha256.len(), 64);
}

#[tokio::test]
async fn index_file_points_at_patient_table() {
    let dir = tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("2021-03-01")).expect("mkdir");
    std::fs::write(
        dir.path().join("2021-03-01/patient_clean.csv"),
        patient_csv(5, 0),
    )
    .expect("write table");
    std::fs::write(
        dir.path().join("latest.csv"),
        "archive,path\nimages,2021-03-01/images.csv\npatient_clean,2021-03-01/patient_clean.csv\n",
    )
    .expect("write index");

    let snapshot = loader()
        .load(&local(&dir.path().join("latest.csv")))
        .await
        .expect("load via index");
    assert_eq!(snapshot.len(), 5);
    assert!(snapshot.summary().source.ends_with("2021-03-01/patient_clean.csv"));
}

#[tokio::test]
async fn versions_strictly_increase_across_loads() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("patient_clean.csv");
    std::fs::write(&path, patient_csv(3, 0)).expect("write csv");
    let loader = loader();
    assert_eq!(loader.last_version(), None);

    let a = loader.load(&local(&path)).await.expect("first");
    let missing = loader.load(&local(&dir.path().join("missing.csv"))).await;
    assert!(missing.is_err());
    let b = loader.load(&local(&path)).await.expect("second");
    assert!(b.version() > a.version());
    assert_eq!(loader.last_version(), Some(b.version()));
}

#[tokio::test]
async fn unreachable_source_fails_the_load() {
    let dir = tempdir().expect("tempdir");
    let err = loader()
        .load(&local(&dir.path().join("nope.csv")))
        .await
        .expect_err("missing file");
    assert_eq!(err.code, LoadErrorCode::SourceUnreachable);
}

#[tokio::test]
async fn empty_or_all_malformed_table_is_an_empty_result() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("patient_clean.csv");
    std::fs::write(&path, patient_csv(0, 4)).expect("write csv");
    let err = loader().load(&local(&path)).await.expect_err("no records");
    assert_eq!(err.code, LoadErrorCode::EmptyResult);

    std::fs::write(&path, HEADER).expect("write header only");
    let err = loader().load(&local(&path)).await.expect_err("header only");
    assert_eq!(err.code, LoadErrorCode::EmptyResult);
}

#[tokio::test]
async fn missing_required_column_is_invalid_source() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("patient_clean.csv");
    std::fs::write(&path, "Pseudonym,age_update\np1,40\n").expect("write csv");
    let err = loader().load(&local(&path)).await.expect_err("no group column");
    assert_eq!(err.code, LoadErrorCode::InvalidSource);
}
