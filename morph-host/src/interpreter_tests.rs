#[cfg(test)]
mod tests {
    use crate::config::HostConfig;
    use crate::error::HostError;
    use crate::loader::Loader;
    use morph_core::ast::Position;
    use morph_core::{DefinitionContext, DefinitionRef, FileId, MacroHook, Namespace, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(source: &str) -> Namespace {
        let loader = Loader::default();
        let ns = loader.new_module_namespace("test");
        loader
            .exec_module(FileId::new("test.mo"), source, &ns)
            .unwrap();
        ns
    }

    fn run_err(source: &str) -> HostError {
        let loader = Loader::default();
        let ns = loader.new_module_namespace("test");
        loader
            .exec_module(FileId::new("test.mo"), source, &ns)
            .unwrap_err()
    }

    // ===== Evaluation Tests =====

    #[test]
    fn test_arithmetic_and_strings() {
        let ns = run("a = 1 + 2 * 3\nb = 'x' + str(a)\nc = -a % 4\nd = 7 / 2\n");
        assert_eq!(ns.get("a"), Some(Value::Integer(7)));
        assert_eq!(ns.get("b"), Some(Value::from("x7")));
        assert_eq!(ns.get("c"), Some(Value::Integer(1)));
        assert_eq!(ns.get("d"), Some(Value::Float(3.5)));
    }

    #[test]
    fn test_boolean_operators_short_circuit() {
        let ns = run("a = 0 or 'fallback'\nb = None and missing()\nc = not []\n");
        assert_eq!(ns.get("a"), Some(Value::from("fallback")));
        assert_eq!(ns.get("b"), Some(Value::None));
        assert_eq!(ns.get("c"), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_functions_and_control_flow() {
        let source = r#"
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)

def count(limit):
    i = 0
    total = 0
    while i < limit:
        i = i + 1
        if i % 2 == 0:
            total = total + i
        elif i == 3:
            pass
        else:
            total = total - 1
    return total

x = fact(5)
y = count(4)
"#;
        let ns = run(source);
        assert_eq!(ns.get("x"), Some(Value::Integer(120)));
        assert_eq!(ns.get("y"), Some(Value::Integer(5)));
    }

    #[test]
    fn test_closures_see_enclosing_locals() {
        let source = "def make(base):\n    def add(x):\n        return base + x\n    return add\nadd2 = make(2)\nr = add2(40)\n";
        let ns = run(source);
        assert_eq!(ns.get("r"), Some(Value::Integer(42)));
    }

    #[test]
    fn test_global_declaration() {
        let source = "counter = 0\ndef bump():\n    global counter\n    counter = counter + 1\nbump()\nbump()\n";
        let ns = run(source);
        assert_eq!(ns.get("counter"), Some(Value::Integer(2)));
    }

    #[test]
    fn test_ordinary_markers_apply_bottom_up() {
        let source = r#"
def exclaim(f):
    def wrapped(x):
        return f(x) + "!"
    return wrapped

def shout(f):
    def wrapped(x):
        return f(x) + "?"
    return wrapped

@exclaim
@shout
def hello(x):
    return "hi " + x

r = hello("bob")
"#;
        let ns = run(source);
        assert_eq!(ns.get("r"), Some(Value::from("hi bob?!")));
    }

    // ===== Error Tests =====

    #[test]
    fn test_unbound_name_reports_location() {
        let HostError::Runtime(err) = run_err("x = 1\ny = x + nope\n") else {
            panic!("expected runtime error");
        };
        assert_eq!(err.message, "name 'nope' is not defined");
        assert_eq!(
            err.location,
            Some((FileId::new("test.mo"), Position::new(2, 8)))
        );
        // Not a generated unit
        assert!(err.origin.is_none());
    }

    #[test]
    fn test_errors_inside_natives_are_located_at_the_call() {
        let HostError::Runtime(err) = run_err("n = len(3)\n") else {
            panic!("expected runtime error");
        };
        assert!(err.message.starts_with("len():"));
        assert_eq!(
            err.location,
            Some((FileId::new("test.mo"), Position::new(1, 4)))
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let HostError::Runtime(err) = run_err("def f(a, b):\n    pass\nf(1)\n") else {
            panic!("expected runtime error");
        };
        assert_eq!(err.message, "f() takes 2 arguments but 1 were given");
    }

    #[test]
    fn test_call_depth_limit() {
        let loader = Loader::new(HostConfig {
            max_call_depth: 20,
            ..HostConfig::default()
        });
        let ns = loader.new_module_namespace("deep");
        let err = loader
            .exec_module(
                FileId::new("deep.mo"),
                "def down(n):\n    return down(n + 1)\ndown(0)\n",
                &ns,
            )
            .unwrap_err();
        assert!(err.to_string().contains("maximum call depth of 20 exceeded"));

        // The depth counter unwinds after the failure
        loader
            .exec_module(
                FileId::new("ok.mo"),
                "def one():\n    return 1\nx = one()\n",
                &ns,
            )
            .unwrap();
    }

    #[test]
    fn test_division_by_zero() {
        let err = run_err("x = 1 / 0\n");
        assert!(err.to_string().contains("Division by zero"));
    }

    // ===== Macro Marker Tests =====

    struct Recording {
        seen: RefCell<Vec<(DefinitionRef, bool)>>,
    }

    impl MacroHook for Recording {
        fn name(&self) -> &str {
            "record"
        }

        fn expand(
            &self,
            definition: &DefinitionRef,
            context: &DefinitionContext,
        ) -> anyhow::Result<Value> {
            self.seen
                .borrow_mut()
                .push((definition.clone(), context.nested));
            Ok(Value::from(format!("expanded {}", definition.name)))
        }
    }

    fn loader_with_macro() -> (Loader, Rc<Recording>, Namespace) {
        let loader = Loader::default();
        let hook = Rc::new(Recording {
            seen: RefCell::new(Vec::new()),
        });
        let ns = loader.new_module_namespace("m");
        ns.set("record", Value::Macro(hook.clone()));
        (loader, hook, ns)
    }

    #[test]
    fn test_macro_marker_replaces_definition() {
        let (loader, hook, ns) = loader_with_macro();
        let source = "x = 1\n\n@record\n@print\ndef greet():\n    pass\n\ndef outer():\n    @record\n    def inner():\n        pass\n    return inner\ny = outer()\n";
        loader
            .exec_module(FileId::new("m.mo"), source, &ns)
            .unwrap();

        assert_eq!(ns.get("greet"), Some(Value::from("expanded greet")));
        assert_eq!(ns.get("y"), Some(Value::from("expanded inner")));
        let seen = hook.seen.borrow();
        assert_eq!(seen[0].0.line, 3);
        assert!(!seen[0].1);
        assert_eq!(seen[1].0.line, 9);
        assert!(seen[1].1);
    }

    #[test]
    fn test_macro_marker_must_lead() {
        let (loader, hook, ns) = loader_with_macro();
        let err = loader
            .exec_module(
                FileId::new("m.mo"),
                "@print\n@record\ndef f():\n    pass\n",
                &ns,
            )
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("marker 'record' must lead the marker list"));
        assert!(hook.seen.borrow().is_empty());
    }

    #[test]
    fn test_failed_expansion_propagates() {
        struct Failing;
        impl MacroHook for Failing {
            fn name(&self) -> &str {
                "failing"
            }
            fn expand(&self, _: &DefinitionRef, _: &DefinitionContext) -> anyhow::Result<Value> {
                anyhow::bail!("cannot expand")
            }
        }

        let loader = Loader::default();
        let ns = loader.new_module_namespace("m");
        ns.set("failing", Value::Macro(Rc::new(Failing)));
        let err = loader
            .exec_module(FileId::new("m.mo"), "@failing\ndef f():\n    pass\n", &ns)
            .unwrap_err();
        assert!(matches!(err, HostError::Expansion(_)));
        assert_eq!(err.to_string(), "cannot expand");
    }
}
