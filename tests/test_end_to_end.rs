//! Integration test: CSV file → root node → search with the holdout evaluator

use kolosal_autofe::config::SearchConfig;
use kolosal_autofe::data::{DataLoader, FeatureType, TaskType};
use kolosal_autofe::evaluator::{Evaluator, HoldoutEvaluator};
use kolosal_autofe::optimizer::{search, SearchReport};
use std::io::Write;

fn write_classification_csv(n: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "age,income,city,segment,label").unwrap();
    let cities = ["paris", "tokyo", "lima"];
    let segments = ["a", "b"];
    for i in 0..n {
        let age = 20.0 + (i % 40) as f64;
        let income = 1000.0 + ((i * 37) % 500) as f64;
        let city = cities[i % 3];
        let segment = segments[(i / 3) % 2];
        let label = if (i % 3 == 0) ^ (segment == "b") { 1 } else { 0 };
        writeln!(file, "{},{},{},{},{}", age, income, city, segment, label).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_search_from_csv() {
    let file = write_classification_csv(90);
    let root = DataLoader::new()
        .load_node(file.path(), "label", TaskType::Classification)
        .unwrap();
    assert_eq!(root.shape(), (90, 4));
    assert_eq!(root.cat_num(), 2);
    assert_eq!(root.feature_types[0], FeatureType::Numerical);

    let evaluator = HoldoutEvaluator::default();
    let root_score = evaluator.evaluate(&root).unwrap();

    let config = SearchConfig::default().with_max_evaluations(15);
    let result = search(root, &evaluator, config).unwrap();

    assert_eq!(result.root_score, root_score);
    assert!(result.best_score() >= root_score);
    assert_eq!(result.stats.evaluations, 15);
    // root, at most one node per budgeted candidate, at most two refinements
    assert!(result.graph.len() <= 1 + 15 + 2);
    assert!(result.graph.node_ids().all(|id| result.graph[id].score.is_some()));
}

#[test]
fn test_report_serializes() {
    let file = write_classification_csv(60);
    let root = DataLoader::new()
        .load_node(file.path(), "label", TaskType::Classification)
        .unwrap();
    let config = SearchConfig::default()
        .with_max_evaluations(5)
        .with_seed(7);
    let result = search(root, &HoldoutEvaluator::default().with_seed(7), config).unwrap();

    let json = serde_json::to_string(&result.report()).unwrap();
    let report: SearchReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report.incumbent.node, result.incumbent.node);
    assert_eq!(report.graph.nodes.len(), result.graph.len());
    assert_eq!(report.best_path, result.best_path());
}

#[test]
fn test_search_is_reproducible() {
    let file = write_classification_csv(60);
    let loader = DataLoader::new();
    let run = || {
        let root = loader
            .load_node(file.path(), "label", TaskType::Classification)
            .unwrap();
        let config = SearchConfig::default().with_max_evaluations(8);
        search(root, &HoldoutEvaluator::default(), config).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.incumbent, second.incumbent);
    assert_eq!(first.graph.len(), second.graph.len());
    assert_eq!(first.stats.frontiers, second.stats.frontiers);
}
