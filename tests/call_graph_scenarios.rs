use std::fs;
use std::path::Path;

use spaghetti::export::{self, DisplayMode, OutputFormat, ReportOptions};
use spaghetti::{Direction, NodeId, Search, SearchOptions};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn options(root: &Path) -> SearchOptions {
    SearchOptions { root: Some(root.to_path_buf()), ..Default::default() }
}

fn edges(search: &Search, id: &NodeId, direction: Direction) -> Vec<NodeId> {
    let graph = search.graph();
    let idx = graph.find(id).unwrap_or_else(|| panic!("missing {}", id));
    let mut out: Vec<NodeId> = graph.query(idx, direction).map(|n| n.id().clone()).collect();
    out.sort();
    out
}

fn raw(direction: Direction) -> ReportOptions {
    ReportOptions { direction, raw: true, ..Default::default() }
}

#[test]
fn lone_function_renders_without_edges() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "u1.py", "def f():\n    pass\n");

    let search = Search::run(&[dir.path().join("u1.py")], &options(dir.path()));
    let f = NodeId::new("u1", "", "f");
    assert!(edges(&search, &f, Direction::Dependents).is_empty());
    assert!(edges(&search, &f, Direction::Dependencies).is_empty());
    assert_eq!(export::to_text(&search, &raw(Direction::Dependents)), "u1:.f");
}

#[test]
fn call_into_imported_module() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "u1.py", "import u2\n\ndef f():\n    g()\n");
    write(dir.path(), "u2.py", "def g():\n    pass\n\ndef unused():\n    pass\n");

    let search = Search::run(&[dir.path().join("u1.py")], &options(dir.path()));
    let f = NodeId::new("u1", "", "f");
    let g = NodeId::new("u2", "", "g");
    assert_eq!(edges(&search, &f, Direction::Dependencies), vec![g.clone()]);
    assert_eq!(edges(&search, &g, Direction::Dependents), vec![f]);

    let graph = search.graph();
    assert!(graph.get(graph.find(&g).unwrap()).is_secondary());
    assert_eq!(search.inputs()[0].crawled_imports.iter().collect::<Vec<_>>(), vec!["u2"]);

    // the edge-less secondary declaration stays out of the listing
    assert_eq!(
        export::to_text(&search, &raw(Direction::Dependents)),
        "u1:.f\nu2:.g (u1:.f)"
    );
    assert_eq!(
        export::to_text(&search, &raw(Direction::Dependencies)),
        "u1:.f (u2:.g)\nu2:.g"
    );
}

#[test]
fn builtins_are_placeholders_only_when_allowed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "u1.py", "def f(xs):\n    return len(xs)\n");
    let file = dir.path().join("u1.py");

    let search = Search::run(&[file.clone()], &options(dir.path()));
    assert!(search.graph().find(&NodeId::builtin("len")).is_none());
    assert_eq!(search.graph().edge_count(), 0);

    let with_builtins = SearchOptions { include_builtins: true, ..options(dir.path()) };
    let search = Search::run(&[file], &with_builtins);
    assert_eq!(
        edges(&search, &NodeId::new("u1", "", "f"), Direction::Dependencies),
        vec![NodeId::new("System", "Builtins", "len")]
    );
}

#[test]
fn ambiguous_method_call_picks_one_target() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "u1.py",
        "class T1:\n    def run(self):\n        pass\n\n\
         class T2:\n    def run(self):\n        pass\n\n\
         def main(obj):\n    obj.run()\n",
    );

    let search = Search::run(&[dir.path().join("u1.py")], &options(dir.path()));
    let main = NodeId::new("u1", "", "main");
    assert_eq!(
        edges(&search, &main, Direction::Dependencies),
        vec![NodeId::new("u1", "T1", "run")]
    );
    assert_eq!(search.ambiguous_calls().len(), 1);
    assert_eq!(search.ambiguous_calls()[0].caller, main);

    let text = export::to_text(&search, &ReportOptions::default());
    assert!(text.contains("Could not definitively resolve: u1:.main -> run"));
}

#[test]
fn missing_import_is_recorded_and_scan_completes() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "u1.py", "import does_not_exist\n\ndef f():\n    pass\n");

    let search = Search::run(&[dir.path().join("u1.py")], &options(dir.path()));
    assert!(search.unresolved_imports().contains("does_not_exist"));
    assert!(search.graph().find(&NodeId::new("u1", "", "f")).is_some());
    assert!(search.failures().is_empty());

    let text = export::to_text(&search, &ReportOptions::default());
    assert!(text.contains("Failed to crawl these imports: does_not_exist"));
    let quiet = export::to_text(&search, &ReportOptions { quiet: true, ..Default::default() });
    assert!(!quiet.contains("Failed to crawl"));
}

#[test]
fn bad_units_are_skipped_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/broken.py", "def nope(:\n    pass\n");
    write(dir.path(), "src/good.py", "def fine():\n    pass\n");
    fs::write(dir.path().join("src/binary.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

    let search = Search::run(&[dir.path().join("src")], &options(dir.path()));
    assert!(search.graph().find(&NodeId::new("good", "", "fine")).is_some());

    let mut skipped: Vec<_> = search
        .failures()
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    skipped.sort();
    assert_eq!(skipped, vec!["binary.py", "broken.py"]);
}

#[test]
fn tester_project_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "testers/tester1.py",
        r#"from testers import tester2


def function1():
    print("function1")
    function2()
    tester2.t2function1()


def function2():
    print("function2")


def function3():
    recursive_function(5)


def recursive_function(remaining):
    if remaining > 0:
        recursive_function(remaining - 1)


def outer_function():
    def inner_function():
        function2()

    inner_function()


class TestClass():

    def __init__(self):
        self.method4()

    def method4(self):
        print("method4")


function3()
"#,
    );
    write(
        dir.path(),
        "testers/tester2.py",
        "def t2function1():\n    pass\n\n\nclass T2Class:\n    def t2method1(self):\n        pass\n",
    );

    let search = Search::run(&[dir.path().join("testers/tester1")], &options(dir.path()));
    assert!(search.failures().is_empty());
    assert_eq!(
        search.crawled_imports().into_iter().collect::<Vec<_>>(),
        vec!["testers.tester2"]
    );
    assert!(search.unresolved_imports().is_empty());

    let t1 = |scope: &str, name: &str| NodeId::new("tester1", scope, name);
    assert_eq!(
        edges(&search, &t1("", "function1"), Direction::Dependencies),
        vec![t1("", "function2"), NodeId::new("tester2", "", "t2function1")]
    );
    assert_eq!(
        edges(&search, &t1("", "function2"), Direction::Dependents),
        vec![t1("", "function1"), t1("", "inner_function")]
    );
    assert_eq!(
        edges(&search, &t1("", "recursive_function"), Direction::Dependents),
        vec![t1("", "function3"), t1("", "recursive_function")]
    );
    assert_eq!(
        edges(&search, &t1("", "outer_function"), Direction::Dependencies),
        vec![t1("", "inner_function")]
    );
    assert_eq!(
        edges(&search, &t1("TestClass", "__init__"), Direction::Dependencies),
        vec![t1("TestClass", "method4")]
    );
    assert_eq!(
        edges(&search, &t1("", "__main__"), Direction::Dependencies),
        vec![t1("", "function3")]
    );

    let listed: Vec<NodeId> = search.render(Direction::Dependents).into_iter().map(|r| r.node).collect();
    assert!(listed.contains(&NodeId::new("tester2", "", "t2function1")));
    assert!(!listed.contains(&NodeId::new("tester2", "T2Class", "t2method1")));
    assert!(!listed.contains(&NodeId::new("tester2", "T2Class", "__init__")));
}

#[test]
fn output_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "import b\n\ndef x():\n    run()\n    y()\n\ndef y():\n    b.z()\n");
    write(
        dir.path(),
        "b.py",
        "def z():\n    pass\n\nclass K:\n    def run(self):\n        pass\n\nclass L:\n    def run(self):\n        pass\n",
    );

    let opts = ReportOptions { display: DisplayMode::Simple, ..Default::default() };
    let first = Search::run(&[dir.path()], &options(dir.path()));
    let second = Search::run(&[dir.path()], &options(dir.path()));
    assert_eq!(export::to_text(&first, &opts), export::to_text(&second, &opts));
    assert_eq!(
        export::to_text(&first, &raw(Direction::Dependencies)),
        export::to_text(&second, &raw(Direction::Dependencies))
    );
}

#[test]
fn json_report_lists_nodes_and_imports() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "u1.py", "import u2\nimport gone\n\ndef f():\n    u2.g()\n");
    write(dir.path(), "u2.py", "def g():\n    pass\n");

    let search = Search::run(&[dir.path().join("u1.py")], &options(dir.path()));
    let opts = ReportOptions { format: OutputFormat::Json, connectivity: true, ..Default::default() };
    let json: serde_json::Value = serde_json::from_str(&export::render(&search, &opts).unwrap()).unwrap();

    assert_eq!(json["direction"], "dependents");
    assert_eq!(json["crawled_imports"], serde_json::json!(["u2"]));
    assert_eq!(json["unresolved_imports"], serde_json::json!(["gone"]));
    assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(json["nodes"][1]["node"]["name"], "g");
    assert_eq!(json["nodes"][1]["edges"][0]["name"], "f");
    assert_eq!(json["connectivity"]["nodes"], 1);
}
