//! End-to-end analysis phase: from files on disk to proposed column groups.

use std::io::Write;
use std::path::Path;

use spreadsheet_consolidator::analysis::analyze_sources;
use spreadsheet_consolidator::config::SourceItem;
use spreadsheet_consolidator::execution::{CancellationToken, NullJobObserver};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_csv(dir: &Path, name: &str, content: &str) -> SourceItem {
    init_logs();
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    SourceItem::new(path, None)
}

#[test]
fn spelling_variants_of_the_same_column_group_together() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_csv(
        dir.path(),
        "a.csv",
        "CNPJ;Valor\n11222333000181;10\n99888777000166;20\n",
    );
    let b = write_csv(
        dir.path(),
        "b.csv",
        "C.N.P.J.;Valor\n55444333000122;30\n",
    );

    let groups = analyze_sources(
        &[a, b],
        b';',
        &NullJobObserver,
        &CancellationToken::new(),
    )
    .unwrap()
    .into_completed()
    .unwrap();

    // One group for the CNPJ variants, one for Valor.
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].members.len(), 2);
    assert_eq!(groups[0].members[0].column, "CNPJ");
    assert_eq!(groups[0].members[1].column, "C.N.P.J.");
    assert_eq!(groups[1].members.len(), 2);
    assert!(groups[1].members.iter().all(|m| m.column == "Valor"));
}

#[test]
fn header_rows_are_located_past_leading_noise() {
    let dir = tempfile::tempdir().unwrap();
    let noisy = write_csv(
        dir.path(),
        "noisy.csv",
        "relatorio mensal;;\n;;\nid;nome;valor\n1;ana;10\n2;bob;20\n",
    );

    let groups = analyze_sources(
        &[noisy],
        b';',
        &NullJobObserver,
        &CancellationToken::new(),
    )
    .unwrap()
    .into_completed()
    .unwrap();

    let columns: Vec<&str> = groups
        .iter()
        .flat_map(|g| g.members.iter().map(|m| m.column.as_str()))
        .collect();
    assert_eq!(columns, vec!["id", "nome", "valor"]);
}

#[test]
fn unreadable_items_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_csv(dir.path(), "good.csv", "id;v\n1;2\n");
    let missing = SourceItem::new(dir.path().join("missing.csv"), None);

    let groups = analyze_sources(
        &[missing, good],
        b';',
        &NullJobObserver,
        &CancellationToken::new(),
    )
    .unwrap()
    .into_completed()
    .unwrap();
    assert_eq!(groups.len(), 2);
}

#[test]
fn cancelled_token_short_circuits_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_csv(dir.path(), "a.csv", "id;v\n1;2\n");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = analyze_sources(&[a], b';', &NullJobObserver, &cancel).unwrap();
    assert!(outcome.is_cancelled());
}
