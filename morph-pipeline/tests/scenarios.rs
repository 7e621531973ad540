//! End-to-end passes triggered by markers in host modules

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use morph_core::ast::{Literal, Node, Position};
use morph_core::{FileId, Graph, Namespace, Value};
use morph_host::{HostConfig, HostError, Loader};
use morph_pipeline::{
    rewrite_names, Identity, PassOptions, Pipeline, PipelineError, ScopeRequest,
    TransformContext, TransformError, Transformed, Transformer,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Rewrites ALL-CAPS names into `getenv("NAME")` support calls
fn env_lookup(mut graph: Graph, _: &TransformContext<'_>) -> Result<Transformed, TransformError> {
    rewrite_names(&mut graph, |graph, name| {
        let is_env = name.chars().any(|c| c.is_ascii_uppercase())
            && name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !is_env {
            return Ok(None);
        }
        let function = graph.add_support_ref("getenv")?;
        let key = graph.add_node(Node::Literal(Literal::String(name.to_string())))?;
        Ok(Some(Node::Call {
            function,
            args: vec![key],
        }))
    })?;
    Ok(Transformed::Definition(graph))
}

struct Host {
    loader: Loader,
    pipeline: Rc<Pipeline>,
    module: Namespace,
}

impl Host {
    fn new(environment: &[(&str, &str)]) -> Self {
        let loader = Loader::default();
        let environment: HashMap<String, String> = environment
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        loader.register_support(
            "getenv",
            Value::native("getenv", Some(1), move |args| {
                let key = args[0].as_str()?;
                Ok(environment
                    .get(key)
                    .map_or(Value::None, |value| Value::from(value.as_str())))
            }),
        );
        let pipeline = Rc::new(Pipeline::for_loader(&loader));
        let module = loader.new_module_namespace("app");
        Self {
            loader,
            pipeline,
            module,
        }
    }

    fn marker(&self, name: &str, transformer: impl Transformer + 'static, options: PassOptions) {
        let marker = self.pipeline.marker(name, transformer, options);
        self.module.set(name, marker);
    }

    fn run(&self, source: &str) -> Result<(), HostError> {
        self.loader
            .exec_module(FileId::new("app.mo"), source, &self.module)
    }
}

fn pipeline_error(err: HostError) -> PipelineError {
    let err = match err {
        HostError::Expansion(err) => err,
        other => panic!("expected an expansion failure, got {other}"),
    };
    match err.downcast::<PipelineError>() {
        Ok(err) => err,
        Err(err) => panic!("expected a pipeline error, got {err}"),
    }
}

// ===== Scenario 1: environment lookups =====

#[test]
fn test_env_dsl_reads_support_environment() {
    init_tracing();
    let host = Host::new(&[("USER", "alice")]);
    host.marker("env", env_lookup, PassOptions::default());

    host.run("@env\ndef whoami():\n    return \"You are: \" + USER\n\nresult = whoami()\n")
        .unwrap();

    assert_eq!(host.module.get("result"), Some(Value::from("You are: alice")));
    // Only the definition's own name reaches the module
    assert_eq!(
        host.module.names(),
        vec!["env".to_string(), "result".to_string(), "whoami".to_string()]
    );
}

#[test]
fn test_env_dsl_generated_text() {
    let host = Host::new(&[("HOME", "/home/alice")]);
    host.marker("env", env_lookup, PassOptions::default().with_print_codegen(true));

    host.run("@env\ndef home(suffix):\n    return HOME + suffix\n")
        .unwrap();

    let generated = host
        .loader
        .sources()
        .text(&FileId::new("<morph:home#1>"))
        .unwrap();
    assert_eq!(
        &*generated,
        "import getenv\ndef home(suffix):\n    return getenv(\"HOME\") + suffix\n"
    );
    let home = host.module.get("home").unwrap();
    assert_eq!(
        host.loader.call(&home, &[Value::from("/bin")]).unwrap(),
        Value::from("/home/alice/bin")
    );
}

#[test]
fn test_ambient_support_imports_land_in_module() {
    let host = Host::new(&[("USER", "alice"), ("HOME", "/home/alice")]);
    host.marker(
        "env",
        env_lookup,
        PassOptions::default().with_scope(ScopeRequest::Ambient),
    );

    host.run("@env\ndef user():\n    return USER\n\n@env\ndef home():\n    return HOME\n\nu = user()\n")
        .unwrap();

    assert_eq!(host.module.get("u"), Some(Value::from("alice")));
    assert_eq!(
        host.module.names(),
        vec![
            "env".to_string(),
            "getenv".to_string(),
            "home".to_string(),
            "u".to_string(),
            "user".to_string()
        ]
    );
    // The second unit finds the import left by the first
    let second = host
        .loader
        .sources()
        .text(&FileId::new("<morph:home#1>"))
        .unwrap();
    assert_eq!(&*second, "def home():\n    return getenv(\"HOME\")\n");
}

// ===== Scenario 2: stacked markers =====

/// Records the markers still attached when the transformer runs
struct MarkerLog {
    seen: Rc<RefCell<Vec<usize>>>,
}

impl Transformer for MarkerLog {
    fn transform(
        &self,
        graph: Graph,
        _context: &TransformContext<'_>,
    ) -> Result<Transformed, TransformError> {
        let remaining = graph
            .root_function()
            .map_or(0, |(_, def)| def.markers.len());
        self.seen.borrow_mut().push(remaining);
        Ok(Transformed::Definition(graph))
    }
}

#[test]
fn test_each_pass_consumes_the_front_marker() {
    init_tracing();
    let host = Host::new(&[]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    host.marker("outer", MarkerLog { seen: seen.clone() }, PassOptions::default());
    host.marker("inner", MarkerLog { seen: seen.clone() }, PassOptions::default());

    host.run("@outer\n@inner\ndef twice(x):\n    return x * 2\n\ny = twice(21)\n")
        .unwrap();

    assert_eq!(*seen.borrow(), vec![1, 0]);
    assert_eq!(host.module.get("y"), Some(Value::Integer(42)));

    // The first pass regenerated the remaining marker for the second
    let first = host
        .loader
        .sources()
        .text(&FileId::new("<morph:twice#1>"))
        .unwrap();
    assert_eq!(&*first, "@inner\ndef twice(x):\n    return x * 2\n");
    let second = host
        .loader
        .sources()
        .text(&FileId::new("<morph:twice#2>"))
        .unwrap();
    assert_eq!(&*second, "def twice(x):\n    return x * 2\n");
}

#[test]
fn test_ordinary_decorators_survive_the_pass() {
    let host = Host::new(&[]);
    host.marker("same", Identity, PassOptions::default());

    let source = r#"
def loud(f):
    def wrapped(x):
        return f(x) + "!"
    return wrapped

@same
@loud
def hello(name):
    return "hi " + name

r = hello("bob")
"#;
    host.run(source).unwrap();
    assert_eq!(host.module.get("r"), Some(Value::from("hi bob!")));
}

#[test]
fn test_comment_and_blank_line_after_marker() {
    let host = Host::new(&[]);
    host.marker("same", Identity, PassOptions::default());

    let source = "@same\n# note\ndef f(x):\n    return x + 1\n\n@same\n\ndef g(x):\n    return f(x) * 2\n\nr = g(1)\n";
    host.run(source).unwrap();
    assert_eq!(host.module.get("r"), Some(Value::Integer(4)));
}

// ===== Scenario 3: positions in nested definitions =====

const FLAT: &str = "\
@same
def inner():
    a = 1
    return a + missing
";

const NESTED: &str = "\
def outer():
    def middle():
        @same
        def inner():
            a = 1
            return a + missing
        return inner
    return middle

m = outer()
f = m()
";

/// Runs `source` through a late-resolving module loader while generated
/// units compile with eager resolution
fn compile_error(source: &str) -> PipelineError {
    let loader = Loader::default();
    let eager = Loader::with_sources(HostConfig::eager(), loader.sources().clone());
    let pipeline = Rc::new(Pipeline::for_loader(&eager));
    let module = loader.new_module_namespace("app");
    module.set("same", pipeline.marker("same", Identity, PassOptions::default()));

    let err = loader
        .exec_module(FileId::new("app.mo"), source, &module)
        .unwrap_err();
    pipeline_error(err)
}

#[test]
fn test_nested_error_column_includes_indentation() {
    let PipelineError::CompileError {
        message,
        file,
        position: flat,
        ..
    } = compile_error(FLAT)
    else {
        panic!("expected compile error");
    };
    assert_eq!(message, "name 'missing' is not defined");
    assert_eq!(file, FileId::new("app.mo"));
    assert_eq!(flat, Position::new(4, 15));

    let err = compile_error(NESTED);
    assert_eq!(
        err.to_string(),
        "app.mo:6:23: name 'missing' is not defined"
    );
    let PipelineError::CompileError {
        position: nested,
        citation,
        generated,
        ..
    } = err
    else {
        panic!("expected compile error");
    };
    // Column shifts by the 8 columns of nesting, line by the start line
    assert_eq!(nested.col, flat.col + 8);
    assert_eq!(nested.line, flat.line + (3 - 1));
    assert_eq!(citation.as_deref(), Some("            return a + missing"));
    assert_eq!(generated, "def inner():\n    a = 1\n    return a + missing\n");
}

// ===== Runtime failures =====

#[test]
fn test_runtime_error_cites_definition_site() {
    let host = Host::new(&[]);
    host.marker("same", Identity, PassOptions::default());

    let source = "x = 0\n\ndef outer():\n    @same\n    def ratio(n):\n        return n / x\n    return ratio\n\nr = outer()\n";
    host.run(source).unwrap();

    let ratio = host.module.get("r").unwrap();
    let HostError::Runtime(err) = host.loader.call(&ratio, &[Value::Integer(1)]).unwrap_err() else {
        panic!("expected runtime error");
    };
    assert_eq!(
        err.location,
        Some((FileId::new("<morph:ratio#1>"), Position::new(2, 11)))
    );
    assert_eq!(
        err.origin,
        Some((FileId::new("app.mo"), Position::new(6, 15)))
    );
}

#[test]
fn test_failing_decorator_in_generated_unit() {
    let host = Host::new(&[]);
    host.marker("same", Identity, PassOptions::default());
    host.module.set(
        "boom",
        Value::native("boom", Some(1), |_| {
            Err(morph_core::ValueError::InvalidOperation("boom".to_string()))
        }),
    );

    let err = pipeline_error(
        host.run("y = 1\n\n@same\n@boom\ndef f():\n    pass\n")
            .unwrap_err(),
    );
    let PipelineError::Runtime(err) = err else {
        panic!("expected runtime error");
    };
    assert_eq!(
        err.origin,
        Some((FileId::new("app.mo"), Position::new(4, 1)))
    );
}

#[test]
fn test_pipelines_sharing_a_loader_keep_their_origins() {
    let host = Host::new(&[]);
    host.marker("same", Identity, PassOptions::default());
    let other = Rc::new(Pipeline::for_loader(&host.loader));
    let library = host.loader.new_module_namespace("lib");
    library.set("also", other.marker("also", Identity, PassOptions::default()));

    host.run("@same\ndef f(x):\n    return 1 / x\n").unwrap();
    host.loader
        .exec_module(
            FileId::new("lib.mo"),
            "\n\n\n@also\ndef f(x):\n    return x / 0\n",
            &library,
        )
        .unwrap();

    let first = host.module.get("f").unwrap();
    let HostError::Runtime(err) = host.loader.call(&first, &[Value::Integer(0)]).unwrap_err() else {
        panic!("expected runtime error");
    };
    assert_eq!(
        err.location,
        Some((FileId::new("<morph:f#1>"), Position::new(2, 11)))
    );
    assert_eq!(err.origin, Some((FileId::new("app.mo"), Position::new(3, 11))));

    let second = library.get("f").unwrap();
    let HostError::Runtime(err) = host.loader.call(&second, &[Value::Integer(1)]).unwrap_err() else {
        panic!("expected runtime error");
    };
    assert_eq!(
        err.location,
        Some((FileId::new("<morph:f#2>"), Position::new(2, 11)))
    );
    assert_eq!(err.origin, Some((FileId::new("lib.mo"), Position::new(6, 11))));
}
