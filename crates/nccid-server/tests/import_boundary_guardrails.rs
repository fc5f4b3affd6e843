// SPDX-License-Identifier: Apache-2.0

fn assert_layer_avoids(layer: &str, forbidden: &[&str]) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src").join(layer);
    let files = rust_files_under(&root);
    assert!(!files.is_empty(), "no sources found under src/{layer}");
    for path in files {
        let text = std::fs::read_to_string(&path).expect("read source file");
        for token in forbidden {
            assert!(
                !text.contains(token),
                "{layer} file {} contains forbidden token: {}",
                path.display(),
                token
            );
        }
    }
}

#[test]
fn http_layer_does_not_reach_past_the_service() {
    assert_layer_avoids(
        "http",
        &[
            "nccid_store::",
            "crate::dataset_store::",
            "crate::cache::",
            "tokio::fs::",
            "std::fs::",
        ],
    );
}

#[test]
fn runtime_layer_does_not_import_http_protocol_modules() {
    assert_layer_avoids("runtime", &["crate::http::", "axum::", "hyper::"]);
}

#[test]
fn cache_layer_is_independent_of_loading_and_transport() {
    assert_layer_avoids(
        "cache",
        &["crate::runtime::", "crate::http::", "nccid_store::", "axum::"],
    );
}

#[test]
fn services_compute_views_only_through_the_cache() {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/services/mod.rs");
    let text = std::fs::read_to_string(path).expect("read services");
    assert_eq!(
        text.matches("nccid_query::compute(").count(),
        1,
        "views must be computed inside the cache's compute closure"
    );
}

fn rust_files_under(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out
}
